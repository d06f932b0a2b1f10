use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_locus_reconcile::app::{
    App, AugmentResult, ResolveResult, ValidateResult, XrefResult,
};
use kira_locus_reconcile::augment::AugmentStatus;
use kira_locus_reconcile::config::ConfigLoader;
use kira_locus_reconcile::error::ReconcileError;
use kira_locus_reconcile::gene_index::FileGeneIndex;
use kira_locus_reconcile::output::{JsonOutput, OutputMode, TracingProgress};

#[derive(Parser)]
#[command(name = "kira-lr")]
#[command(about = "Reconcile gene identifiers in supplementary tables against organism locus tags")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Build alias to locus tag cross-reference tables per organism")]
    Xref(OrganismArgs),
    #[command(about = "Write copies of analysis tables with a resolved locus tag column")]
    Augment(AugmentArgs),
    #[command(about = "Diagnose why analysis identifiers fail to match loaded genes")]
    Validate(OrganismArgs),
    #[command(about = "Resolve ad-hoc identifiers for one organism")]
    Resolve(ResolveArgs),
}

#[derive(Args)]
struct OrganismArgs {
    #[arg(long)]
    organism: Option<String>,
}

#[derive(Args)]
struct AugmentArgs {
    #[arg(long)]
    analysis: Option<String>,
}

#[derive(Args)]
struct ResolveArgs {
    #[arg(long)]
    organism: String,

    #[arg(required = true)]
    ids: Vec<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<ReconcileError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ReconcileError) -> u8 {
    match error {
        ReconcileError::MissingConfig
        | ReconcileError::ConfigRead(_)
        | ReconcileError::ConfigParse(_)
        | ReconcileError::InvalidConfig(_)
        | ReconcileError::InvalidPattern { .. }
        | ReconcileError::UnknownOrganism(_)
        | ReconcileError::UnknownAnalysis(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let app = App::new(config, FileGeneIndex);

    match cli.command {
        Commands::Xref(args) => {
            let result = match output_mode {
                OutputMode::Json => app.xref(args.organism.as_deref(), &JsonOutput)?,
                OutputMode::Human => app.xref(args.organism.as_deref(), &TracingProgress)?,
            };
            match output_mode {
                OutputMode::Json => JsonOutput::print_xref(&result).into_diagnostic()?,
                OutputMode::Human => print_xref_summary(&result),
            }
        }
        Commands::Augment(args) => {
            let result = match output_mode {
                OutputMode::Json => app.augment(args.analysis.as_deref(), &JsonOutput)?,
                OutputMode::Human => app.augment(args.analysis.as_deref(), &TracingProgress)?,
            };
            match output_mode {
                OutputMode::Json => JsonOutput::print_augment(&result).into_diagnostic()?,
                OutputMode::Human => print_augment_summary(&result),
            }
        }
        Commands::Validate(args) => {
            let result = match output_mode {
                OutputMode::Json => app.validate(args.organism.as_deref(), &JsonOutput)?,
                OutputMode::Human => app.validate(args.organism.as_deref(), &TracingProgress)?,
            };
            match output_mode {
                OutputMode::Json => JsonOutput::print_validate(&result).into_diagnostic()?,
                OutputMode::Human => print_validate_summary(&result),
            }
        }
        Commands::Resolve(args) => {
            let result = app.resolve_ids(&args.organism, &args.ids)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_resolve(&result).into_diagnostic()?,
                OutputMode::Human => print_resolve_summary(&result),
            }
        }
    }
    Ok(())
}

fn print_xref_summary(result: &XrefResult) {
    println!("cross-reference summary");
    for organism in &result.organisms {
        if !organism.lookup_loaded {
            println!("  {}: no master identifier table", organism.organism);
            continue;
        }
        println!(
            "  {}: {} records from {} tables ({} alias collisions)",
            organism.organism,
            organism.records,
            organism.tables.len(),
            organism.collisions
        );
        if let Some(path) = &organism.output_path {
            println!("    {path}");
        }
        if let Some(path) = &organism.collisions_path {
            println!("    {path}");
        }
    }
    if !result.excluded.is_empty() {
        println!("  excluded analyses (organism not in registry):");
        for excluded in &result.excluded {
            println!("    {} ({})", excluded.analysis, excluded.organism);
        }
    }
}

fn print_augment_summary(result: &AugmentResult) {
    println!("augment summary");
    for report in &result.analyses {
        match (&report.status, &report.stats) {
            (AugmentStatus::Written | AugmentStatus::Cached, Some(stats)) => {
                println!(
                    "  {}: {}/{} resolved ({:.1}%), direct {}, alias {}, re-padded {}, composite {}, skipped {}, unmapped {}",
                    report.analysis,
                    stats.resolved(),
                    stats.total,
                    stats.coverage() * 100.0,
                    stats.direct,
                    stats.alias_lookup,
                    stats.re_padded,
                    stats.composite,
                    stats.skipped,
                    stats.unmapped
                );
                if !stats.unmapped_examples.is_empty() {
                    println!("    unmapped e.g. {}", stats.unmapped_examples.join(", "));
                }
            }
            (status, _) => {
                let message = report.message.as_deref().unwrap_or("");
                println!("  {}: {status:?} {message}", report.analysis);
            }
        }
    }
}

fn print_validate_summary(result: &ValidateResult) {
    print!("{}", result.report);
    if let Some(path) = &result.report_path {
        println!("report written to {path}");
    }
}

fn print_resolve_summary(result: &ResolveResult) {
    if !result.lookup_loaded {
        println!("warning: no master identifier table for {}", result.organism);
    }
    for item in &result.items {
        match (&item.locus_tag, item.method) {
            (Some(locus_tag), Some(method)) => {
                println!("{}\t{locus_tag}\t{method}", item.input)
            }
            _ if item.skipped => println!("{}\t-\tnon-coding", item.input),
            _ => println!("{}\t-\tunmapped", item.input),
        }
    }
}
