use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::augment::{AugmentReport, AugmentStatus, TableAugmenter};
use crate::config::{AnalysisDeclaration, ResolvedConfig};
use crate::domain::ResolutionMethod;
use crate::error::ReconcileError;
use crate::gene_index::GeneIndex;
use crate::lookup::{CanonicalLookup, build_lookup};
use crate::registry::OrganismRecord;
use crate::report::{self, DiagnosticSummary};
use crate::resolve::{RowResolution, resolve_row};
use crate::store::OutputStore;
use crate::validate::{DiagnosticResult, DiagnosticValidator};
use crate::xref::{CrossReferenceAggregator, XrefTableReport};

#[derive(Debug, Clone, Serialize)]
pub struct ExcludedAnalysis {
    pub analysis: String,
    pub organism: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct XrefOrganismResult {
    pub organism: String,
    pub lookup_loaded: bool,
    pub records: usize,
    pub collisions: usize,
    pub output_path: Option<String>,
    pub collisions_path: Option<String>,
    pub tables: Vec<XrefTableReport>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct XrefResult {
    pub organisms: Vec<XrefOrganismResult>,
    pub excluded: Vec<ExcludedAnalysis>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AugmentResult {
    pub analyses: Vec<AugmentReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidateResult {
    pub results: Vec<DiagnosticResult>,
    pub summary: DiagnosticSummary,
    pub report_path: Option<String>,
    #[serde(skip)]
    pub report: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolveItem {
    pub input: String,
    pub locus_tag: Option<String>,
    pub method: Option<ResolutionMethod>,
    pub skipped: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolveResult {
    pub organism: String,
    pub lookup_loaded: bool,
    pub items: Vec<ResolveItem>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

fn phase(sink: &dyn ProgressSink, message: String) {
    sink.event(ProgressEvent {
        message,
        elapsed: None,
    });
}

/// Runs reconciliation jobs over every declared analysis.
pub struct App<G: GeneIndex> {
    config: ResolvedConfig,
    store: OutputStore,
    index: G,
}

impl<G: GeneIndex> App<G> {
    pub fn new(config: ResolvedConfig, index: G) -> Self {
        let store = OutputStore::new(config.output_dir.clone());
        Self {
            config,
            store,
            index,
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn store(&self) -> &OutputStore {
        &self.store
    }

    pub fn xref(
        &self,
        organism: Option<&str>,
        sink: &dyn ProgressSink,
    ) -> Result<XrefResult, ReconcileError> {
        let wanted = self.organism_filter(organism)?;
        self.store.ensure_root()?;

        let mut groups: BTreeMap<String, (&OrganismRecord, Vec<&AnalysisDeclaration>)> =
            BTreeMap::new();
        let mut excluded = Vec::new();
        for analysis in &self.config.analyses {
            let Some(record) = self.config.registry.resolve(&analysis.organism) else {
                warn!(
                    analysis = %analysis.id,
                    organism = %analysis.organism,
                    "organism not in registry; excluded from cross-reference"
                );
                excluded.push(ExcludedAnalysis {
                    analysis: analysis.id.clone(),
                    organism: analysis.organism.clone(),
                    reason: "organism not in registry".to_string(),
                });
                continue;
            };
            if wanted.is_some_and(|name| name != record.name) {
                continue;
            }
            groups
                .entry(record.name.clone())
                .or_insert_with(|| (record, Vec::new()))
                .1
                .push(analysis);
        }

        let mut organisms = Vec::with_capacity(groups.len());
        for (name, (record, analyses)) in groups {
            let start = Instant::now();
            phase(sink, format!("phase=Load; master table for {name}"));
            let Some(lookup) =
                build_lookup(record.master_table.as_std_path(), &self.config.rules.heuristics)
            else {
                organisms.push(XrefOrganismResult {
                    organism: name,
                    lookup_loaded: false,
                    records: 0,
                    collisions: 0,
                    output_path: None,
                    collisions_path: None,
                    tables: Vec::new(),
                    message: Some("master identifier table unavailable".to_string()),
                });
                continue;
            };

            phase(sink, format!("phase=Classify; {} analyses for {name}", analyses.len()));
            phase(sink, format!("phase=Resolve; table rows for {name}"));
            let outcome = CrossReferenceAggregator::new(&lookup, &self.config.rules)
                .aggregate(&analyses);

            phase(sink, format!("phase=Write; cross-references for {name}"));
            let mut result = XrefOrganismResult {
                organism: name.clone(),
                lookup_loaded: true,
                records: outcome.records.len(),
                collisions: lookup.collisions().len(),
                output_path: None,
                collisions_path: None,
                tables: outcome.tables,
                message: None,
            };
            if !outcome.records.is_empty() {
                let path = self.store.xref_path(&name);
                match OutputStore::write_csv(&path, &outcome.records) {
                    Ok(()) => result.output_path = Some(path.to_string()),
                    Err(err) => {
                        warn!(organism = %name, error = %err, "failed to write cross-references");
                        result.message = Some(err.to_string());
                    }
                }
            }
            if !lookup.collisions().is_empty() {
                let path = self.store.collisions_path(&name);
                match OutputStore::write_csv(&path, lookup.collisions()) {
                    Ok(()) => result.collisions_path = Some(path.to_string()),
                    Err(err) => {
                        warn!(organism = %name, error = %err, "failed to write alias collisions");
                    }
                }
            }
            sink.event(ProgressEvent {
                message: format!("phase=Done; {name}: {} records", result.records),
                elapsed: Some(start.elapsed()),
            });
            info!(organism = %name, records = result.records, "cross-reference complete");
            organisms.push(result);
        }

        Ok(XrefResult {
            organisms,
            excluded,
        })
    }

    pub fn augment(
        &self,
        analysis: Option<&str>,
        sink: &dyn ProgressSink,
    ) -> Result<AugmentResult, ReconcileError> {
        let selected = self.select_analyses(analysis)?;
        self.store.ensure_root()?;

        let mut lookups: HashMap<String, Option<CanonicalLookup>> = HashMap::new();
        let mut augmenter = TableAugmenter::new(&self.store, &self.config.rules);
        let mut reports = Vec::with_capacity(selected.len());
        for analysis in selected {
            let Some(record) = self.config.registry.resolve(&analysis.organism) else {
                warn!(
                    analysis = %analysis.id,
                    organism = %analysis.organism,
                    "organism not in registry; skipping"
                );
                reports.push(AugmentReport::new(analysis, AugmentStatus::UnknownOrganism));
                continue;
            };
            let lookup = lookups.entry(record.name.clone()).or_insert_with(|| {
                phase(sink, format!("phase=Load; master table for {}", record.name));
                build_lookup(record.master_table.as_std_path(), &self.config.rules.heuristics)
            });
            let Some(lookup) = lookup.as_ref() else {
                let mut report = AugmentReport::new(analysis, AugmentStatus::NoLookup);
                report.organism = record.name.clone();
                reports.push(report);
                continue;
            };

            phase(sink, format!("phase=Resolve; {}", analysis.id));
            let mut report = augmenter.augment(analysis, record, lookup);
            report.organism = record.name.clone();
            reports.push(report);
        }
        Ok(AugmentResult { analyses: reports })
    }

    pub fn validate(
        &self,
        organism: Option<&str>,
        sink: &dyn ProgressSink,
    ) -> Result<ValidateResult, ReconcileError> {
        let wanted = self.organism_filter(organism)?;
        let mut validator =
            DiagnosticValidator::new(&self.config.registry, &self.index, &self.config.rules);

        let mut results = Vec::new();
        for analysis in &self.config.analyses {
            if let Some(name) = wanted {
                let resolved = self.config.registry.resolve(&analysis.organism);
                if resolved.is_none_or(|record| record.name != name) {
                    continue;
                }
            }
            phase(sink, format!("phase=Resolve; sampling {}", analysis.id));
            results.push(validator.validate(analysis));
        }

        phase(sink, "phase=Write; diagnostic report".to_string());
        let report = report::render_text(&results, &chrono::Utc::now().to_rfc3339());
        let path = self.store.diagnostics_path();
        let report_path = match OutputStore::write_bytes_atomic(&path, report.as_bytes()) {
            Ok(()) => Some(path.to_string()),
            Err(err) => {
                warn!(error = %err, "failed to write diagnostic report");
                None
            }
        };

        Ok(ValidateResult {
            summary: DiagnosticSummary::from_results(&results),
            results,
            report_path,
            report,
        })
    }

    pub fn resolve_ids(
        &self,
        organism: &str,
        ids: &[String],
    ) -> Result<ResolveResult, ReconcileError> {
        let record = self
            .config
            .registry
            .resolve(organism)
            .ok_or_else(|| ReconcileError::UnknownOrganism(organism.to_string()))?;
        let rules = &self.config.rules;
        let lookup = build_lookup(record.master_table.as_std_path(), &rules.heuristics);
        let empty = CanonicalLookup::default();
        let items = ids
            .iter()
            .map(|id| {
                let mut item = ResolveItem {
                    input: id.clone(),
                    locus_tag: None,
                    method: None,
                    skipped: false,
                };
                match resolve_row(id, lookup.as_ref().unwrap_or(&empty), rules) {
                    RowResolution::Resolved(locus_tag, method) => {
                        item.locus_tag = Some(locus_tag.to_string());
                        item.method = Some(method);
                    }
                    RowResolution::Skipped => item.skipped = true,
                    RowResolution::Unmapped => {}
                }
                item
            })
            .collect();
        Ok(ResolveResult {
            organism: record.name.clone(),
            lookup_loaded: lookup.is_some(),
            items,
        })
    }

    fn organism_filter(&self, organism: Option<&str>) -> Result<Option<&str>, ReconcileError> {
        organism
            .map(|name| {
                self.config
                    .registry
                    .resolve(name)
                    .map(|record| record.name.as_str())
                    .ok_or_else(|| ReconcileError::UnknownOrganism(name.to_string()))
            })
            .transpose()
    }

    fn select_analyses(
        &self,
        analysis: Option<&str>,
    ) -> Result<Vec<&AnalysisDeclaration>, ReconcileError> {
        match analysis {
            None => Ok(self.config.analyses.iter().collect()),
            Some(id) => self
                .config
                .analyses
                .iter()
                .find(|analysis| analysis.id == id)
                .map(|analysis| vec![analysis])
                .ok_or_else(|| ReconcileError::UnknownAnalysis(id.to_string())),
        }
    }
}
