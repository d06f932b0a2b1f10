use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Serialize;

use crate::domain::{DiagnosticStatus, Strategy};
use crate::validate::DiagnosticResult;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticSummary {
    pub total: usize,
    pub matched: usize,
    pub partial: usize,
    pub no_match: usize,
    pub errors: usize,
    pub strategies: BTreeMap<Strategy, usize>,
}

impl DiagnosticSummary {
    pub fn from_results(results: &[DiagnosticResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for result in results {
            match result.status {
                DiagnosticStatus::Match => summary.matched += 1,
                DiagnosticStatus::PartialMatch => summary.partial += 1,
                DiagnosticStatus::NoMatch => summary.no_match += 1,
                DiagnosticStatus::Error => summary.errors += 1,
            }
            if let Some(strategy) = result.strategy {
                *summary.strategies.entry(strategy).or_default() += 1;
            }
        }
        summary
    }
}

pub fn render_text(results: &[DiagnosticResult], generated_at: &str) -> String {
    let summary = DiagnosticSummary::from_results(results);
    let mut out = String::new();
    let rule = "=".repeat(96);

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "GENE IDENTIFIER DIAGNOSTICS");
    let _ = writeln!(out, "generated: {generated_at}");
    let _ = writeln!(out, "{rule}");

    for result in results {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "[{}] {} / {} ({})",
            result.status, result.paper, result.table, result.analysis
        );
        let _ = writeln!(out, "  organism:   {}", result.organism);
        let _ = writeln!(out, "  match rate: {:.1}%", result.match_rate * 100.0);
        if let Some(strategy) = result.strategy {
            match &result.suggestion {
                Some(suggestion) => {
                    let _ = writeln!(out, "  strategy:   {strategy} ({suggestion})");
                }
                None => {
                    let _ = writeln!(out, "  strategy:   {strategy}");
                }
            }
        }
        let _ = writeln!(out, "  detail:     {}", result.explanation);
        if !result.sample.is_empty() {
            let _ = writeln!(out, "  sample:     {}", result.sample.join(", "));
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "{:<30} {:<30} {:<14} {:<20}",
        "PAPER", "TABLE", "STATUS", "STRATEGY"
    );
    let _ = writeln!(out, "{}", "-".repeat(96));
    for result in results {
        let strategy = result
            .strategy
            .map(|strategy| strategy.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:<30} {:<30} {:<14} {:<20}",
            truncate(&result.paper, 30),
            truncate(&result.table, 30),
            result.status.to_string(),
            strategy
        );
    }
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "total: {}  match: {}  partial: {}  no match: {}  error: {}",
        summary.total, summary.matched, summary.partial, summary.no_match, summary.errors
    );
    if !summary.strategies.is_empty() {
        let _ = writeln!(out, "strategies:");
        for (strategy, count) in &summary.strategies {
            let _ = writeln!(out, "  {:<20} {count}", strategy.to_string());
        }
    }
    out
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut out = value.chars().take(width.saturating_sub(3)).collect::<String>();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: DiagnosticStatus, strategy: Option<Strategy>) -> DiagnosticResult {
        DiagnosticResult {
            analysis: "smith_2020_1".to_string(),
            paper: "Smith 2020".to_string(),
            table: "Table_S1_differential_expression_all_conditions.csv".to_string(),
            organism: "MED4".to_string(),
            status,
            strategy,
            explanation: "explanation".to_string(),
            match_rate: 0.25,
            suggestion: Some("Alias".to_string()),
            sample: vec!["PMM0001".to_string()],
        }
    }

    #[test]
    fn summary_counts_statuses_and_strategies() {
        let results = vec![
            result(DiagnosticStatus::Match, None),
            result(DiagnosticStatus::PartialMatch, Some(Strategy::ChangeNameCol)),
            result(DiagnosticStatus::NoMatch, Some(Strategy::ChangeNameCol)),
            result(DiagnosticStatus::Error, None),
        ];
        let summary = DiagnosticSummary::from_results(&results);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.partial, 1);
        assert_eq!(summary.no_match, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.strategies[&Strategy::ChangeNameCol], 2);
    }

    #[test]
    fn text_report_has_fixed_width_table() {
        let results = vec![result(
            DiagnosticStatus::PartialMatch,
            Some(Strategy::CreateMappingCsv),
        )];
        let text = render_text(&results, "2026-01-01T00:00:00Z");
        assert!(text.contains("strategy:   CREATE_MAPPING_CSV (Alias)"));
        assert!(text.contains("Table_S1_differential_expre..."));
        assert!(text.contains("partial: 1"));
        assert!(text.contains("  CREATE_MAPPING_CSV   1"));
    }
}
