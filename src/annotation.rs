use std::collections::{BTreeMap, BTreeSet};
use std::io::BufRead;

use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::warn;

use crate::error::ReconcileError;
use crate::fs_util;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeHit {
    pub attribute: String,
    pub matched: usize,
    pub rate: f64,
}

/// Attribute key → indices of sample identifiers found (as substrings) in its values.
pub type AttributeMatches = BTreeMap<String, BTreeSet<usize>>;

pub fn scan_gff(
    reader: impl BufRead,
    sample: &[String],
    matches: &mut AttributeMatches,
) -> std::io::Result<()> {
    for line in reader.lines() {
        let line = line?;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let Some(attributes) = line.split('\t').nth(8) else {
            continue;
        };
        for attribute in attributes.split(';') {
            let Some((key, value)) = attribute.split_once('=') else {
                continue;
            };
            let key = key.trim();
            for (idx, id) in sample.iter().enumerate() {
                if value.contains(id.as_str()) {
                    matches.entry(key.to_string()).or_default().insert(idx);
                }
            }
        }
    }
    Ok(())
}

/// Scans every annotation file and returns the attribute that contains the most sample ids.
pub fn best_attribute(files: &[Utf8PathBuf], sample: &[String]) -> Option<AttributeHit> {
    if sample.is_empty() {
        return None;
    }
    let mut matches = AttributeMatches::new();
    for file in files {
        let result = fs_util::open_text(file.as_std_path()).and_then(|reader| {
            scan_gff(reader, sample, &mut matches)
                .map_err(|err| ReconcileError::table_read(file.as_std_path(), err))
        });
        if let Err(err) = result {
            warn!(path = %file, error = %err, "skipping unreadable annotation file");
        }
    }

    let mut best: Option<(&String, usize)> = None;
    for (attribute, found) in &matches {
        if best.map(|(_, count)| found.len() > count).unwrap_or(true) {
            best = Some((attribute, found.len()));
        }
    }
    best.map(|(attribute, matched)| AttributeHit {
        attribute: attribute.clone(),
        matched,
        rate: matched as f64 / sample.len() as f64,
    })
}
