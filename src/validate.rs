use std::collections::{HashMap, HashSet};

use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::{debug, warn};

use crate::annotation;
use crate::config::AnalysisDeclaration;
use crate::domain::{DiagnosticStatus, Strategy};
use crate::gene_index::GeneIndex;
use crate::heuristics::Rules;
use crate::lookup::{CanonicalLookup, build_lookup};
use crate::registry::{OrganismRecord, OrganismRegistry};
use crate::resolve::clean_identifier;
use crate::table::Table;

const SAMPLE_PREVIEW: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticResult {
    pub analysis: String,
    pub paper: String,
    pub table: String,
    pub organism: String,
    pub status: DiagnosticStatus,
    pub strategy: Option<Strategy>,
    pub explanation: String,
    pub match_rate: f64,
    pub suggestion: Option<String>,
    pub sample: Vec<String>,
}

impl DiagnosticResult {
    fn new(analysis: &AnalysisDeclaration) -> Self {
        Self {
            analysis: analysis.id.clone(),
            paper: analysis.paper.clone(),
            table: analysis.table_name(),
            organism: analysis.organism.clone(),
            status: DiagnosticStatus::Error,
            strategy: None,
            explanation: String::new(),
            match_rate: 0.0,
            suggestion: None,
            sample: Vec::new(),
        }
    }

    fn error(mut self, explanation: impl Into<String>) -> Self {
        self.status = DiagnosticStatus::Error;
        self.explanation = explanation.into();
        self
    }

    fn no_match(
        mut self,
        strategy: Strategy,
        suggestion: Option<String>,
        explanation: impl Into<String>,
    ) -> Self {
        self.status = if self.match_rate > 0.0 {
            DiagnosticStatus::PartialMatch
        } else {
            DiagnosticStatus::NoMatch
        };
        self.strategy = Some(strategy);
        self.suggestion = suggestion;
        self.explanation = explanation.into();
        self
    }
}

/// Triages analyses whose identifiers do not line up with the loaded gene index.
pub struct DiagnosticValidator<'a, G: GeneIndex> {
    registry: &'a OrganismRegistry,
    index: &'a G,
    rules: &'a Rules,
    genes: HashMap<String, Option<HashSet<String>>>,
    lookups: HashMap<Utf8PathBuf, Option<CanonicalLookup>>,
}

impl<'a, G: GeneIndex> DiagnosticValidator<'a, G> {
    pub fn new(registry: &'a OrganismRegistry, index: &'a G, rules: &'a Rules) -> Self {
        Self {
            registry,
            index,
            rules,
            genes: HashMap::new(),
            lookups: HashMap::new(),
        }
    }

    pub fn validate(&mut self, analysis: &AnalysisDeclaration) -> DiagnosticResult {
        let result = DiagnosticResult::new(analysis);
        let table = match Table::read(analysis.table.as_std_path(), analysis.skip_rows) {
            Ok(table) => table,
            Err(err) => {
                warn!(analysis = %analysis.id, error = %err, "unreadable table");
                return result.error(err.to_string());
            }
        };
        let name_idx = match table.column_index(&analysis.name_col) {
            Ok(idx) => idx,
            Err(err) => {
                warn!(analysis = %analysis.id, error = %err, "name column missing");
                return result.error(err.to_string());
            }
        };

        let sample = self.sample_column(&table, name_idx);
        if sample.is_empty() {
            return result.error("no valid identifiers");
        }
        self.diagnose(analysis, &table, name_idx, sample, result)
    }

    fn diagnose(
        &mut self,
        analysis: &AnalysisDeclaration,
        table: &Table,
        name_idx: usize,
        sample: Vec<String>,
        mut result: DiagnosticResult,
    ) -> DiagnosticResult {
        let rules = self.rules;
        let heuristics = &rules.heuristics;
        result.sample = sample.iter().take(SAMPLE_PREVIEW).cloned().collect();

        let Some(organism) = self.registry.resolve(&analysis.organism).cloned() else {
            warn!(analysis = %analysis.id, organism = %analysis.organism, "organism not in registry");
            return result.no_match(
                Strategy::LoadOrganism,
                None,
                format!("organism {} is not registered", analysis.organism),
            );
        };
        result.organism = organism.name.clone();

        let Some(genes) = self.genes_for(&organism) else {
            return result.no_match(
                Strategy::LoadOrganism,
                None,
                format!("no genes loaded for {}", organism.name),
            );
        };

        result.match_rate = match_rate(&sample, |id| genes.contains(id));
        debug!(analysis = %analysis.id, rate = result.match_rate, "primary match rate");
        if result.match_rate >= heuristics.match_threshold {
            result.status = DiagnosticStatus::Match;
            result.explanation = format!(
                "{:.0}% of sampled identifiers match loaded genes",
                result.match_rate * 100.0
            );
            return result;
        }

        if let Some((column, rate)) = self.best_alternate_column(table, name_idx, &genes) {
            return result.no_match(
                Strategy::ChangeNameCol,
                Some(column.clone()),
                format!(
                    "column {column} matches {:.0}% of loaded genes; use it as name column",
                    rate * 100.0
                ),
            );
        }

        if let Some((column, rate)) = self.best_alias_column(&organism, &sample) {
            return result.no_match(
                Strategy::CreateMappingCsv,
                Some(column.clone()),
                format!(
                    "{:.0}% of identifiers found in master table column {column}",
                    rate * 100.0
                ),
            );
        }

        let files = organism.annotation_files();
        if let Some(hit) = annotation::best_attribute(&files, &sample)
            .filter(|hit| hit.rate >= heuristics.fallback_threshold)
        {
            return result.no_match(
                Strategy::CreateMappingGff,
                Some(hit.attribute.clone()),
                format!(
                    "{:.0}% of identifiers found in annotation attribute {}",
                    hit.rate * 100.0,
                    hit.attribute
                ),
            );
        }

        result.no_match(
            Strategy::UnrelatedIds,
            None,
            "identifiers not found in genes, alternate columns, master table or annotations; manual investigation required",
        )
    }

    /// Up to `sample_size` distinct cleaned identifiers, non-coding features removed.
    fn sample_column(&self, table: &Table, column: usize) -> Vec<String> {
        let heuristics = &self.rules.heuristics;
        let mut sample: Vec<String> = Vec::new();
        for value in table.column_values(column) {
            let id = clean_identifier(value);
            if heuristics.is_missing(id) || self.rules.is_non_coding(id) {
                continue;
            }
            if !sample.iter().any(|seen| seen == id) {
                sample.push(id.to_string());
            }
            if sample.len() >= heuristics.sample_size {
                break;
            }
        }
        sample
    }

    fn best_alternate_column(
        &self,
        table: &Table,
        name_idx: usize,
        genes: &HashSet<String>,
    ) -> Option<(String, f64)> {
        let threshold = self.rules.heuristics.fallback_threshold;
        let mut best: Option<(String, f64)> = None;
        for (idx, header) in table.headers.iter().enumerate() {
            if idx == name_idx {
                continue;
            }
            let sample = self.sample_column(table, idx);
            if sample.is_empty() {
                continue;
            }
            let rate = match_rate(&sample, |id| genes.contains(id));
            if rate >= threshold && best.as_ref().map(|(_, r)| rate > *r).unwrap_or(true) {
                best = Some((header.trim().to_string(), rate));
            }
        }
        best
    }

    fn best_alias_column(
        &mut self,
        organism: &OrganismRecord,
        sample: &[String],
    ) -> Option<(String, f64)> {
        let threshold = self.rules.heuristics.fallback_threshold;
        let lookup = self.lookup_for(organism)?;
        let mut best: Option<(String, f64)> = None;
        for (column, aliases) in lookup.column_lookups() {
            let rate = match_rate(sample, |id| aliases.contains_key(id));
            if rate >= threshold && best.as_ref().map(|(_, r)| rate > *r).unwrap_or(true) {
                best = Some((column.clone(), rate));
            }
        }
        best
    }

    fn genes_for(&mut self, organism: &OrganismRecord) -> Option<HashSet<String>> {
        let index = self.index;
        self.genes
            .entry(organism.name.clone())
            .or_insert_with(|| index.genes(organism))
            .clone()
    }

    fn lookup_for(&mut self, organism: &OrganismRecord) -> Option<&CanonicalLookup> {
        let rules = self.rules;
        let heuristics = &rules.heuristics;
        self.lookups
            .entry(organism.master_table.clone())
            .or_insert_with(|| build_lookup(organism.master_table.as_std_path(), heuristics))
            .as_ref()
    }
}

pub fn match_rate(sample: &[String], contains: impl Fn(&str) -> bool) -> f64 {
    if sample.is_empty() {
        return 0.0;
    }
    let matched = sample.iter().filter(|id| contains(id.as_str())).count();
    matched as f64 / sample.len() as f64
}
