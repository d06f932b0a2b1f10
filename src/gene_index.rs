use std::collections::{HashMap, HashSet};
use std::io::BufRead;

use tracing::{debug, warn};

use crate::fs_util;
use crate::registry::OrganismRecord;

/// Gene identifiers already materialized for an organism in the knowledge base.
pub trait GeneIndex {
    /// `None` when the organism has no genome loaded at all.
    fn genes(&self, organism: &OrganismRecord) -> Option<HashSet<String>>;
}

/// Reads the exported gene-id list configured for each organism.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileGeneIndex;

impl GeneIndex for FileGeneIndex {
    fn genes(&self, organism: &OrganismRecord) -> Option<HashSet<String>> {
        let path = organism.gene_index.as_std_path();
        if !path.exists() {
            debug!(organism = %organism.name, path = %organism.gene_index, "no gene index exported");
            return None;
        }
        let reader = match fs_util::open_text(path) {
            Ok(reader) => reader,
            Err(err) => {
                warn!(organism = %organism.name, error = %err, "failed to open gene index");
                return None;
            }
        };

        let mut genes = HashSet::new();
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!(organism = %organism.name, error = %err, "failed to read gene index");
                    return None;
                }
            };
            if let Some(id) = parse_index_line(&line) {
                genes.insert(id.to_string());
            }
        }
        (!genes.is_empty()).then_some(genes)
    }
}

fn parse_index_line(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let first = line
        .split(['\t', ','])
        .next()
        .unwrap_or(line)
        .trim()
        .trim_matches('"');
    (!first.is_empty()).then_some(first)
}

/// In-memory index keyed by organism name.
#[derive(Debug, Clone, Default)]
pub struct StaticGeneIndex {
    genes: HashMap<String, HashSet<String>>,
}

impl StaticGeneIndex {
    pub fn insert<I, S>(&mut self, organism: &str, genes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genes
            .entry(organism.to_string())
            .or_default()
            .extend(genes.into_iter().map(Into::into));
    }
}

impl GeneIndex for StaticGeneIndex {
    fn genes(&self, organism: &OrganismRecord) -> Option<HashSet<String>> {
        self.genes
            .get(&organism.name)
            .filter(|genes| !genes.is_empty())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::*;

    #[test]
    fn reads_exported_gene_ids() {
        let temp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        std::fs::write(
            dir.join("gene_index.txt"),
            "# exported gene nodes\nPMM0001\n\"PMM0002\",dnaK\nPMM0003\tx\n\n",
        )
        .unwrap();
        let record = OrganismRecord::with_defaults("MED4", dir);

        let genes = FileGeneIndex.genes(&record).unwrap();
        assert_eq!(genes.len(), 3);
        assert!(genes.contains("PMM0002"));
    }

    #[test]
    fn missing_or_empty_index_means_not_loaded() {
        let temp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let record = OrganismRecord::with_defaults("MED4", dir.clone());
        assert!(FileGeneIndex.genes(&record).is_none());

        std::fs::write(dir.join("gene_index.txt"), "# nothing yet\n").unwrap();
        assert!(FileGeneIndex.genes(&record).is_none());
    }
}
