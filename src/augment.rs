use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::AnalysisDeclaration;
use crate::domain::ResolutionMethod;
use crate::error::ReconcileError;
use crate::fs_util;
use crate::heuristics::Rules;
use crate::lookup::CanonicalLookup;
use crate::registry::OrganismRecord;
use crate::resolve::{RowResolution, resolve_row};
use crate::store::OutputStore;
use crate::table::Table;

const UNMAPPED_EXAMPLES: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionStats {
    pub total: usize,
    pub direct: usize,
    pub alias_lookup: usize,
    pub re_padded: usize,
    pub composite: usize,
    pub skipped: usize,
    pub unmapped: usize,
    pub unmapped_examples: Vec<String>,
}

impl ResolutionStats {
    pub fn record(&mut self, raw_id: &str, resolution: &RowResolution) {
        self.total += 1;
        match resolution {
            RowResolution::Skipped => self.skipped += 1,
            RowResolution::Unmapped => {
                self.unmapped += 1;
                let raw_id = raw_id.trim();
                if !raw_id.is_empty()
                    && self.unmapped_examples.len() < UNMAPPED_EXAMPLES
                    && !self.unmapped_examples.iter().any(|seen| seen == raw_id)
                {
                    self.unmapped_examples.push(raw_id.to_string());
                }
            }
            RowResolution::Resolved(_, method) => match method {
                ResolutionMethod::Direct => self.direct += 1,
                ResolutionMethod::AliasLookup => self.alias_lookup += 1,
                ResolutionMethod::RePadded => self.re_padded += 1,
                ResolutionMethod::CompositeDirect | ResolutionMethod::CompositeLookup => {
                    self.composite += 1
                }
            },
        }
    }

    pub fn resolved(&self) -> usize {
        self.direct + self.alias_lookup + self.re_padded + self.composite
    }

    /// Share of coding rows that received a locus tag.
    pub fn coverage(&self) -> f64 {
        let coding = self.total - self.skipped;
        if coding == 0 {
            0.0
        } else {
            self.resolved() as f64 / coding as f64
        }
    }
}

/// Resolves every row's primary identifier; unresolved rows get an empty string.
pub fn resolve_column(
    table: &Table,
    name_idx: usize,
    lookup: &CanonicalLookup,
    rules: &Rules,
) -> (Vec<String>, ResolutionStats) {
    let mut stats = ResolutionStats::default();
    let values = (0..table.rows.len())
        .map(|row| {
            let raw_id = table.cell(row, name_idx);
            let resolution = resolve_row(raw_id, lookup, rules);
            stats.record(raw_id, &resolution);
            match resolution {
                RowResolution::Resolved(locus_tag, _) => locus_tag.to_string(),
                RowResolution::Skipped | RowResolution::Unmapped => String::new(),
            }
        })
        .collect();
    (values, stats)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AugmentStatus {
    Written,
    Cached,
    Unreadable,
    MissingColumn,
    UnknownOrganism,
    NoLookup,
    WriteFailed,
}

#[derive(Debug, Clone, Serialize)]
pub struct AugmentReport {
    pub analysis: String,
    pub organism: String,
    pub table: String,
    pub status: AugmentStatus,
    pub output_path: Option<String>,
    pub stats: Option<ResolutionStats>,
    pub message: Option<String>,
}

impl AugmentReport {
    pub fn new(analysis: &AnalysisDeclaration, status: AugmentStatus) -> Self {
        Self {
            analysis: analysis.id.clone(),
            organism: analysis.organism.clone(),
            table: analysis.table_name(),
            status,
            output_path: None,
            stats: None,
            message: None,
        }
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

type CacheKey = (Utf8PathBuf, Utf8PathBuf, String);

/// Writes copies of analysis tables with an appended locus tag column.
pub struct TableAugmenter<'a> {
    store: &'a OutputStore,
    rules: &'a Rules,
    cache: HashMap<CacheKey, (Vec<u8>, ResolutionStats)>,
}

impl<'a> TableAugmenter<'a> {
    pub fn new(store: &'a OutputStore, rules: &'a Rules) -> Self {
        Self {
            store,
            rules,
            cache: HashMap::new(),
        }
    }

    pub fn augment(
        &mut self,
        analysis: &AnalysisDeclaration,
        organism: &OrganismRecord,
        lookup: &CanonicalLookup,
    ) -> AugmentReport {
        let key = (
            analysis.table.clone(),
            organism.directory.clone(),
            analysis.name_col.trim().to_string(),
        );
        let output_path = self
            .store
            .augmented_path(&analysis.paper, &analysis.id, &analysis.table_name());

        if let Some((bytes, stats)) = self.cache.get(&key) {
            return write_report(
                analysis,
                AugmentStatus::Cached,
                &output_path,
                bytes,
                stats.clone(),
            );
        }

        let table = match Table::read(analysis.table.as_std_path(), analysis.skip_rows) {
            Ok(table) => table,
            Err(err) => {
                warn!(analysis = %analysis.id, error = %err, "skipping unreadable table");
                return AugmentReport::new(analysis, AugmentStatus::Unreadable)
                    .with_message(err.to_string());
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
                return AugmentReport::new(analysis, AugmentStatus::MissingColumn)
                    .with_message(err.to_string());
            }
        };

        let (values, stats) = resolve_column(&table, name_idx, lookup, self.rules);
        let header = self.augmented_header(&table);
        let encoded = table.to_bytes_with_column(&header, &values).and_then(|bytes| {
            if fs_util::is_gzip(&table.path) {
                fs_util::gzip_bytes(&bytes)
            } else {
                Ok(bytes)
            }
        });
        let bytes = match encoded {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(analysis = %analysis.id, error = %err, "failed to encode augmented table");
                let mut report = AugmentReport::new(analysis, AugmentStatus::WriteFailed)
                    .with_message(err.to_string());
                report.stats = Some(stats);
                return report;
            }
        };

        info!(
            analysis = %analysis.id,
            total = stats.total,
            direct = stats.direct,
            alias_lookup = stats.alias_lookup,
            re_padded = stats.re_padded,
            composite = stats.composite,
            skipped = stats.skipped,
            unmapped = stats.unmapped,
            "resolved table identifiers"
        );

        let report = write_report(
            analysis,
            AugmentStatus::Written,
            &output_path,
            &bytes,
            stats.clone(),
        );
        if report.status == AugmentStatus::Written {
            self.cache.insert(key, (bytes, stats));
        }
        report
    }

    fn augmented_header(&self, table: &Table) -> String {
        let wanted = &self.rules.heuristics.augmented_column;
        if table.find_column(wanted).is_none() {
            wanted.clone()
        } else {
            format!("{wanted}_resolved")
        }
    }
}

fn write_report(
    analysis: &AnalysisDeclaration,
    status: AugmentStatus,
    output_path: &Utf8Path,
    bytes: &[u8],
    stats: ResolutionStats,
) -> AugmentReport {
    if let Err(err) = OutputStore::write_bytes_atomic(output_path, bytes) {
        warn!(analysis = %analysis.id, error = %err, "failed to write augmented table");
        let mut report =
            AugmentReport::new(analysis, AugmentStatus::WriteFailed).with_message(err.to_string());
        report.stats = Some(stats);
        return report;
    }
    info!(analysis = %analysis.id, path = %output_path, status = ?status, "wrote augmented table");
    let mut report = AugmentReport::new(analysis, status);
    report.output_path = Some(output_path.to_string());
    report.stats = Some(stats);
    report
}
