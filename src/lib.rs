pub mod annotation;
pub mod app;
pub mod augment;
pub mod classify;
pub mod config;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod gene_index;
pub mod heuristics;
pub mod lookup;
pub mod output;
pub mod registry;
pub mod report;
pub mod resolve;
pub mod store;
pub mod table;
pub mod validate;
pub mod xref;
