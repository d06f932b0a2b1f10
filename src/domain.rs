use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;

/// Canonical, organism-scoped gene identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocusTag(String);

impl LocusTag {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn new_unchecked(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for LocusTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LocusTag {
    type Err = ReconcileError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") || trimmed.contains(',') {
            return Err(ReconcileError::InvalidConfig(format!(
                "invalid locus tag: {value:?}"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionMethod {
    Direct,
    AliasLookup,
    RePadded,
    CompositeDirect,
    CompositeLookup,
}

impl ResolutionMethod {
    pub fn is_composite(self) -> bool {
        matches!(
            self,
            ResolutionMethod::CompositeDirect | ResolutionMethod::CompositeLookup
        )
    }
}

impl fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionMethod::Direct => write!(f, "direct"),
            ResolutionMethod::AliasLookup => write!(f, "alias-lookup"),
            ResolutionMethod::RePadded => write!(f, "re-padded"),
            ResolutionMethod::CompositeDirect => write!(f, "composite-direct"),
            ResolutionMethod::CompositeLookup => write!(f, "composite-lookup"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionOutcome {
    pub locus_tag: Option<LocusTag>,
    pub method: Option<ResolutionMethod>,
}

impl ResolutionOutcome {
    pub fn unresolved() -> Self {
        Self {
            locus_tag: None,
            method: None,
        }
    }

    pub fn resolved(locus_tag: &str, method: ResolutionMethod) -> Self {
        Self {
            locus_tag: Some(LocusTag::new_unchecked(locus_tag)),
            method: Some(method),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.locus_tag.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticStatus {
    #[serde(rename = "MATCH")]
    Match,
    #[serde(rename = "PARTIAL MATCH")]
    PartialMatch,
    #[serde(rename = "NO MATCH")]
    NoMatch,
    #[serde(rename = "ERROR")]
    Error,
}

impl fmt::Display for DiagnosticStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticStatus::Match => write!(f, "MATCH"),
            DiagnosticStatus::PartialMatch => write!(f, "PARTIAL MATCH"),
            DiagnosticStatus::NoMatch => write!(f, "NO MATCH"),
            DiagnosticStatus::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    LoadOrganism,
    ChangeNameCol,
    CreateMappingCsv,
    CreateMappingGff,
    UnrelatedIds,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::LoadOrganism => write!(f, "LOAD_ORGANISM"),
            Strategy::ChangeNameCol => write!(f, "CHANGE_NAME_COL"),
            Strategy::CreateMappingCsv => write!(f, "CREATE_MAPPING_CSV"),
            Strategy::CreateMappingGff => write!(f, "CREATE_MAPPING_GFF"),
            Strategy::UnrelatedIds => write!(f, "UNRELATED_IDS"),
        }
    }
}

/// One discovered alias of a locus tag, with the table it was seen in.
///
/// Field order drives the output sort: locus tag, then paper, then column.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CrossReferenceRecord {
    pub locus_tag: LocusTag,
    pub paper: String,
    pub source_column: String,
    pub alias: String,
    pub source_table: String,
}
