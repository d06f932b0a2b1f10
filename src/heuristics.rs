use regex::RegexSet;
use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasSplit {
    Scalar,
    Space,
    Comma,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasColumn {
    pub name: String,
    #[serde(default = "default_split")]
    pub split: AliasSplit,
}

impl AliasColumn {
    fn new(name: &str, split: AliasSplit) -> Self {
        Self {
            name: name.to_string(),
            split,
        }
    }
}

fn default_split() -> AliasSplit {
    AliasSplit::Scalar
}

/// Tunables shared by the classifier, resolver, aggregator and validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Heuristics {
    pub identifier_keywords: Vec<String>,
    pub description_keywords: Vec<String>,
    pub coordinate_keywords: Vec<String>,
    pub categorical_max_distinct: usize,
    pub categorical_min_repetition: f64,
    pub categorical_min_values: usize,
    pub max_average_length: f64,
    pub max_space_ratio: f64,
    pub non_coding_patterns: Vec<String>,
    pub missing_placeholders: Vec<String>,
    pub locus_tag_column: String,
    pub alias_columns: Vec<AliasColumn>,
    pub padding_extra_zeros: Vec<usize>,
    pub padding_widths: Vec<usize>,
    pub sample_size: usize,
    pub match_threshold: f64,
    pub fallback_threshold: f64,
    pub augmented_column: String,
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            identifier_keywords: strings(&[
                "locus", "tag", "gene", "protein", "orf", "id", "accession", "homolog",
            ]),
            description_keywords: strings(&[
                "product",
                "function",
                "description",
                "annotation",
                "pathway",
                "organism",
                "note",
                "comment",
                "definition",
            ]),
            coordinate_keywords: strings(&["start", "end", "length", "position", "coord"]),
            categorical_max_distinct: 10,
            categorical_min_repetition: 5.0,
            categorical_min_values: 5,
            max_average_length: 50.0,
            max_space_ratio: 0.3,
            non_coding_patterns: strings(&[
                r"(?i)^trna",
                r"(?i)^tmrna",
                r"(?i)^ncrna",
                r"(?i)^rrna",
                r"(?i)^srna",
                r"(?i)^[0-9.]+s[_ -]?rrna",
                r"(?i)^yfr[0-9]+",
                r"(?i)_(t|tm|nc|r|s)rna",
            ]),
            missing_placeholders: strings(&["nan", "na", "n/a", "-"]),
            locus_tag_column: "locus_tag".to_string(),
            alias_columns: vec![
                AliasColumn::new("gene_names", AliasSplit::Space),
                AliasColumn::new("gene", AliasSplit::Scalar),
                AliasColumn::new("locus_tag_ncbi", AliasSplit::Scalar),
                AliasColumn::new("locus_tag_cyanorak", AliasSplit::Scalar),
                AliasColumn::new("cyanorak_locus_tag", AliasSplit::Scalar),
                AliasColumn::new("old_locus_tags", AliasSplit::Comma),
                AliasColumn::new("protein_id", AliasSplit::Scalar),
            ],
            padding_extra_zeros: vec![1, 2],
            padding_widths: vec![4, 5, 6],
            sample_size: 30,
            match_threshold: 0.8,
            fallback_threshold: 0.5,
            augmented_column: "locus_tag".to_string(),
        }
    }
}

impl Heuristics {
    pub fn is_missing(&self, value: &str) -> bool {
        let trimmed = value.trim();
        trimmed.is_empty()
            || self
                .missing_placeholders
                .iter()
                .any(|placeholder| trimmed.eq_ignore_ascii_case(placeholder))
    }

    pub fn validate(&self) -> Result<(), ReconcileError> {
        for (label, value) in [
            ("match_threshold", self.match_threshold),
            ("fallback_threshold", self.fallback_threshold),
            ("max_space_ratio", self.max_space_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ReconcileError::InvalidConfig(format!(
                    "{label} must be within 0..=1, got {value}"
                )));
            }
        }
        if self.sample_size == 0 {
            return Err(ReconcileError::InvalidConfig(
                "sample_size must be positive".to_string(),
            ));
        }
        if self.locus_tag_column.trim().is_empty() {
            return Err(ReconcileError::InvalidConfig(
                "locus_tag_column must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Heuristics with the non-coding patterns compiled. Built once per run.
#[derive(Debug, Clone)]
pub struct Rules {
    pub heuristics: Heuristics,
    non_coding: RegexSet,
}

impl Rules {
    pub fn new(heuristics: Heuristics) -> Result<Self, ReconcileError> {
        heuristics.validate()?;
        for pattern in &heuristics.non_coding_patterns {
            regex::Regex::new(pattern).map_err(|err| ReconcileError::InvalidPattern {
                pattern: pattern.clone(),
                message: err.to_string(),
            })?;
        }
        let non_coding = RegexSet::new(&heuristics.non_coding_patterns).map_err(|err| {
            ReconcileError::InvalidPattern {
                pattern: heuristics.non_coding_patterns.join(" | "),
                message: err.to_string(),
            }
        })?;
        Ok(Self {
            heuristics,
            non_coding,
        })
    }

    /// RNA features never carry a protein-coding locus tag; callers count them as skipped.
    pub fn is_non_coding(&self, raw_id: &str) -> bool {
        let cleaned = raw_id.trim().trim_matches('*').trim();
        !cleaned.is_empty() && self.non_coding.is_match(cleaned)
    }
}

impl Default for Rules {
    fn default() -> Self {
        let heuristics = Heuristics::default();
        let non_coding = RegexSet::new(&heuristics.non_coding_patterns)
            .unwrap_or_else(|_| RegexSet::empty());
        Self {
            heuristics,
            non_coding,
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn non_coding_patterns_match_rna_features() {
        let rules = Rules::default();
        for id in ["tRNA-Leu", "tRNALeu", "ncRNA_12", "rRNA-16S", "Yfr2", "tmRNA", "PMM_tRNA1"] {
            assert!(rules.is_non_coding(id), "{id} should be non-coding");
        }
        for id in ["PMM0001", "dnaN", "WP_011129870.1", "trnD"] {
            assert!(!rules.is_non_coding(id), "{id} should be coding");
        }
    }

    #[test]
    fn missing_placeholders_are_case_insensitive() {
        let heuristics = Heuristics::default();
        assert!(heuristics.is_missing("  "));
        assert!(heuristics.is_missing("NaN"));
        assert!(!heuristics.is_missing("PMM0001"));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let heuristics = Heuristics {
            non_coding_patterns: vec!["(unclosed".to_string()],
            ..Heuristics::default()
        };
        let err = Rules::new(heuristics).unwrap_err();
        assert_matches!(err, ReconcileError::InvalidPattern { .. });
    }

    #[test]
    fn partial_overrides_keep_defaults() {
        let heuristics: Heuristics = serde_json::from_str(r#"{"sample_size": 12}"#).unwrap();
        assert_eq!(heuristics.sample_size, 12);
        assert_eq!(heuristics.categorical_max_distinct, 10);
    }
}
