use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;
use crate::fs_util::slug;
use crate::heuristics::{Heuristics, Rules};
use crate::registry::{OrganismRecord, OrganismRegistry};

pub const CONFIG_FILE_NAME: &str = "kira-lr.json";

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub organisms: BTreeMap<String, OrganismEntry>,
    #[serde(default)]
    pub papers: Vec<PaperEntry>,
    #[serde(default)]
    pub heuristics: Heuristics,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OrganismEntry {
    Shorthand(String),
    Detailed(OrganismEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct OrganismEntryObject {
    pub directory: String,
    #[serde(default)]
    pub master_table: Option<String>,
    #[serde(default)]
    pub gene_index: Option<String>,
    #[serde(default)]
    pub annotations: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PaperEntry {
    pub name: String,
    #[serde(default)]
    pub analyses: Vec<AnalysisEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AnalysisEntry {
    #[serde(default)]
    pub id: Option<String>,
    pub organism: String,
    pub table: String,
    pub name_col: String,
    #[serde(default)]
    pub effect_size_col: Option<String>,
    #[serde(default)]
    pub significance_col: Option<String>,
    #[serde(default)]
    pub skip_rows: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisDeclaration {
    pub id: String,
    pub paper: String,
    pub organism: String,
    pub table: Utf8PathBuf,
    pub name_col: String,
    pub effect_size_col: Option<String>,
    pub significance_col: Option<String>,
    pub skip_rows: usize,
}

impl AnalysisDeclaration {
    /// The primary identifier column and declared measurement columns are never
    /// alias candidates.
    pub fn excluded_columns(&self) -> HashSet<String> {
        [
            Some(&self.name_col),
            self.effect_size_col.as_ref(),
            self.significance_col.as_ref(),
        ]
        .into_iter()
        .flatten()
        .map(|column| column.trim().to_string())
        .collect()
    }

    pub fn table_name(&self) -> String {
        self.table
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| self.table.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub output_dir: Utf8PathBuf,
    pub registry: OrganismRegistry,
    pub analyses: Vec<AnalysisDeclaration>,
    pub rules: Rules,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, ReconcileError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => default_config_path().ok_or(ReconcileError::MissingConfig)?,
        };

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ReconcileError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| ReconcileError::ConfigParse(err.to_string()))?;

        let base_dir = config_path
            .parent()
            .map(|parent| parent.to_path_buf())
            .unwrap_or_default();
        let base_dir = Utf8PathBuf::from_path_buf(base_dir)
            .map_err(|_| ReconcileError::InvalidConfig("non-utf8 config path".to_string()))?;
        Self::resolve_config(config, &base_dir)
    }

    pub fn resolve_config(
        config: Config,
        base_dir: &Utf8Path,
    ) -> Result<ResolvedConfig, ReconcileError> {
        let schema_version = config.schema_version.unwrap_or(1);
        if schema_version != 1 {
            return Err(ReconcileError::InvalidConfig(format!(
                "unsupported schema_version {schema_version}"
            )));
        }

        let output_dir = relative_to(
            base_dir,
            config.output_dir.as_deref().unwrap_or("reconciled"),
        );

        let records = config
            .organisms
            .into_iter()
            .map(|(name, entry)| match entry {
                OrganismEntry::Shorthand(directory) => Ok(OrganismRecord::with_defaults(
                    &name,
                    relative_to(base_dir, &directory),
                )),
                OrganismEntry::Detailed(obj) => {
                    let directory = relative_to(base_dir, &obj.directory);
                    let mut record = OrganismRecord::with_defaults(&name, directory.clone());
                    if let Some(master) = obj.master_table {
                        record.master_table = relative_to(&directory, &master);
                    }
                    if let Some(index) = obj.gene_index {
                        record.gene_index = relative_to(&directory, &index);
                    }
                    record.annotations = obj
                        .annotations
                        .unwrap_or_default()
                        .iter()
                        .map(|path| relative_to(&directory, path))
                        .collect();
                    Ok(record)
                }
            })
            .collect::<Result<Vec<_>, ReconcileError>>()?;

        let mut analyses = Vec::new();
        let mut seen_ids = HashSet::new();
        for paper in config.papers {
            for (idx, entry) in paper.analyses.into_iter().enumerate() {
                let id = entry
                    .id
                    .unwrap_or_else(|| format!("{}_{}", slug(&paper.name), idx + 1));
                if !seen_ids.insert(id.clone()) {
                    return Err(ReconcileError::InvalidConfig(format!(
                        "duplicate analysis id {id}"
                    )));
                }
                if entry.name_col.trim().is_empty() {
                    return Err(ReconcileError::InvalidConfig(format!(
                        "analysis {id} has an empty name_col"
                    )));
                }
                analyses.push(AnalysisDeclaration {
                    id,
                    paper: paper.name.clone(),
                    organism: entry.organism,
                    table: relative_to(base_dir, &entry.table),
                    name_col: entry.name_col,
                    effect_size_col: entry.effect_size_col,
                    significance_col: entry.significance_col,
                    skip_rows: entry.skip_rows.unwrap_or(0),
                });
            }
        }

        Ok(ResolvedConfig {
            schema_version,
            output_dir,
            registry: OrganismRegistry::new(records),
            analyses,
            rules: Rules::new(config.heuristics)?,
        })
    }
}

fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }
    BaseDirs::new()
        .map(|dirs| dirs.config_dir().join("kira-lr").join(CONFIG_FILE_NAME))
        .filter(|path| path.exists())
}

fn relative_to(base: &Utf8Path, path: &str) -> Utf8PathBuf {
    let path = Utf8PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
