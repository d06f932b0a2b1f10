use std::collections::{BTreeSet, HashSet};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classify::is_identifier_column;
use crate::config::AnalysisDeclaration;
use crate::domain::CrossReferenceRecord;
use crate::error::ReconcileError;
use crate::heuristics::Rules;
use crate::lookup::CanonicalLookup;
use crate::resolve::{RowResolution, resolve_row};
use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Processed,
    Shared,
    Unreadable,
    MissingColumn,
    NoCandidates,
}

#[derive(Debug, Clone, Serialize)]
pub struct XrefTableReport {
    pub analysis: String,
    pub table: String,
    pub status: TableStatus,
    pub candidate_columns: Vec<String>,
    pub rows: usize,
    pub resolved: usize,
    pub skipped: usize,
    pub unmapped: usize,
    pub records_added: usize,
    pub message: Option<String>,
}

impl XrefTableReport {
    fn new(analysis: &AnalysisDeclaration, status: TableStatus) -> Self {
        Self {
            analysis: analysis.id.clone(),
            table: analysis.table_name(),
            status,
            candidate_columns: Vec::new(),
            rows: 0,
            resolved: 0,
            skipped: 0,
            unmapped: 0,
            records_added: 0,
            message: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct XrefOutcome {
    pub records: Vec<CrossReferenceRecord>,
    pub tables: Vec<XrefTableReport>,
}

/// Collects alias → locus tag facts from every analysis of one organism.
pub struct CrossReferenceAggregator<'a> {
    lookup: &'a CanonicalLookup,
    rules: &'a Rules,
}

impl<'a> CrossReferenceAggregator<'a> {
    pub fn new(lookup: &'a CanonicalLookup, rules: &'a Rules) -> Self {
        Self { lookup, rules }
    }

    pub fn aggregate(&self, analyses: &[&AnalysisDeclaration]) -> XrefOutcome {
        let mut records = BTreeSet::new();
        let mut handled = HashSet::new();
        let mut tables = Vec::with_capacity(analyses.len());

        for analysis in analyses {
            let key = (analysis.table.clone(), analysis.name_col.trim().to_string());
            if !handled.insert(key) {
                debug!(analysis = %analysis.id, table = %analysis.table, "table already handled");
                tables.push(XrefTableReport::new(analysis, TableStatus::Shared));
                continue;
            }
            tables.push(self.aggregate_table(analysis, &mut records));
        }

        XrefOutcome {
            records: records.into_iter().collect(),
            tables,
        }
    }

    fn aggregate_table(
        &self,
        analysis: &AnalysisDeclaration,
        records: &mut BTreeSet<CrossReferenceRecord>,
    ) -> XrefTableReport {
        let heuristics = &self.rules.heuristics;
        let table = match Table::read(analysis.table.as_std_path(), analysis.skip_rows) {
            Ok(table) => table,
            Err(err) => {
                warn!(analysis = %analysis.id, error = %err, "skipping unreadable table");
                let mut report = XrefTableReport::new(analysis, TableStatus::Unreadable);
                report.message = Some(err.to_string());
                return report;
            }
        };
        let name_idx = match table.column_index(&analysis.name_col) {
            Ok(idx) => idx,
            Err(err) => {
                if let ReconcileError::MissingColumn { available, .. } = &err {
                    warn!(
                        analysis = %analysis.id,
                        column = %analysis.name_col,
                        available = %available,
                        "name column missing"
                    );
                }
                let mut report = XrefTableReport::new(analysis, TableStatus::MissingColumn);
                report.message = Some(err.to_string());
                return report;
            }
        };

        let excluded = analysis.excluded_columns();
        let candidates = table
            .headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != name_idx)
            .filter(|(idx, header)| {
                is_identifier_column(&table.column_values(*idx), header, &excluded, heuristics)
            })
            .map(|(idx, header)| (idx, header.trim().to_string()))
            .collect::<Vec<_>>();

        let mut report = XrefTableReport::new(analysis, TableStatus::Processed);
        report.rows = table.rows.len();
        report.candidate_columns = candidates.iter().map(|(_, name)| name.clone()).collect();
        if candidates.is_empty() {
            info!(analysis = %analysis.id, table = %table.name, "no identifier-like columns");
            report.status = TableStatus::NoCandidates;
            return report;
        }

        let table_name = analysis.table_name();
        for row in 0..table.rows.len() {
            let locus_tag = match resolve_row(table.cell(row, name_idx), self.lookup, self.rules) {
                RowResolution::Resolved(locus_tag, _) => locus_tag,
                RowResolution::Skipped => {
                    report.skipped += 1;
                    continue;
                }
                RowResolution::Unmapped => {
                    report.unmapped += 1;
                    continue;
                }
            };
            report.resolved += 1;
            for (idx, column) in &candidates {
                let alias = table.cell(row, *idx).trim();
                if heuristics.is_missing(alias) {
                    continue;
                }
                let record = CrossReferenceRecord {
                    locus_tag: locus_tag.clone(),
                    paper: analysis.paper.clone(),
                    source_column: column.clone(),
                    alias: alias.to_string(),
                    source_table: table_name.clone(),
                };
                if records.insert(record) {
                    report.records_added += 1;
                }
            }
        }

        info!(
            analysis = %analysis.id,
            table = %table.name,
            columns = report.candidate_columns.len(),
            resolved = report.resolved,
            unmapped = report.unmapped,
            records = report.records_added,
            "collected cross-references"
        );
        report
    }
}
