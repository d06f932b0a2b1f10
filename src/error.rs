use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ReconcileError {
    #[error("missing config file kira-lr.json in current directory")]
    #[diagnostic(help("pass --config PATH or create kira-lr.json"))]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config value: {0}")]
    InvalidConfig(String),

    #[error("invalid identifier pattern {pattern}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("organism not found in registry: {0}")]
    UnknownOrganism(String),

    #[error("analysis not declared: {0}")]
    UnknownAnalysis(String),

    #[error("failed to read table {path}: {message}")]
    TableRead { path: PathBuf, message: String },

    #[error("column {column} not found in {table} (available: {available})")]
    MissingColumn {
        column: String,
        table: String,
        available: String,
    },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl ReconcileError {
    pub fn table_read(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        ReconcileError::TableRead {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
