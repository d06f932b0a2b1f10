use std::collections::BTreeMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganismRecord {
    pub name: String,
    pub directory: Utf8PathBuf,
    pub master_table: Utf8PathBuf,
    pub gene_index: Utf8PathBuf,
    pub annotations: Vec<Utf8PathBuf>,
}

impl OrganismRecord {
    pub fn with_defaults(name: &str, directory: Utf8PathBuf) -> Self {
        Self {
            name: name.to_string(),
            master_table: directory.join("gene_mapping.csv"),
            gene_index: directory.join("gene_index.txt"),
            annotations: Vec::new(),
            directory,
        }
    }

    /// Declared annotation files, or every GFF file found in the organism directory.
    pub fn annotation_files(&self) -> Vec<Utf8PathBuf> {
        if !self.annotations.is_empty() {
            return self.annotations.clone();
        }
        let Ok(entries) = fs::read_dir(self.directory.as_std_path()) else {
            return Vec::new();
        };
        let mut files = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| Utf8PathBuf::from_path_buf(entry.path()).ok())
            .filter(|path| is_gff(path))
            .collect::<Vec<_>>();
        files.sort();
        files
    }
}

fn is_gff(path: &Utf8Path) -> bool {
    let name = path.file_name().unwrap_or("").to_lowercase();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    name.ends_with(".gff") || name.ends_with(".gff3")
}

/// Organism name → data directory, shared by every component of a run.
#[derive(Debug, Clone, Default)]
pub struct OrganismRegistry {
    entries: BTreeMap<String, OrganismRecord>,
}

impl OrganismRegistry {
    pub fn new(records: impl IntoIterator<Item = OrganismRecord>) -> Self {
        Self {
            entries: records
                .into_iter()
                .map(|record| (record.name.clone(), record))
                .collect(),
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &OrganismRecord> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Case-insensitive match; exact names first, then substring in either direction.
    /// Among substring matches the longest registry name wins.
    pub fn resolve(&self, name: &str) -> Option<&OrganismRecord> {
        let wanted = name.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        if let Some(record) = self
            .entries
            .values()
            .find(|record| record.name.to_lowercase() == wanted)
        {
            return Some(record);
        }
        self.entries
            .values()
            .filter(|record| {
                let known = record.name.to_lowercase();
                known.contains(&wanted) || wanted.contains(&known)
            })
            .fold(None, |best: Option<&OrganismRecord>, record| match best {
                Some(current) if current.name.len() >= record.name.len() => Some(current),
                _ => Some(record),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> OrganismRegistry {
        OrganismRegistry::new([
            OrganismRecord::with_defaults("MED4", Utf8PathBuf::from("genomes/MED4")),
            OrganismRecord::with_defaults("MIT9313", Utf8PathBuf::from("genomes/MIT9313")),
            OrganismRecord::with_defaults("Alteromonas HOT1A3", Utf8PathBuf::from("genomes/HOT1A3")),
            OrganismRecord::with_defaults("HOT1A3", Utf8PathBuf::from("genomes/HOT1A3_alt")),
        ])
    }

    #[test]
    fn exact_match_is_case_insensitive() {
        let registry = registry();
        assert_eq!(registry.resolve("med4").unwrap().name, "MED4");
    }

    #[test]
    fn substring_match_both_directions() {
        let registry = registry();
        assert_eq!(
            registry.resolve("Prochlorococcus MED4").unwrap().name,
            "MED4"
        );
        assert_eq!(registry.resolve("9313").unwrap().name, "MIT9313");
    }

    #[test]
    fn longest_name_wins_ambiguous_matches() {
        let registry = registry();
        assert_eq!(
            registry.resolve("Alteromonas macleodii HOT1A3 strain").unwrap().name,
            "HOT1A3"
        );
        assert_eq!(
            registry.resolve("alteromonas hot1a3 (pro99)").unwrap().name,
            "Alteromonas HOT1A3"
        );
    }

    #[test]
    fn unknown_organism_is_none() {
        let registry = registry();
        assert!(registry.resolve("Synechococcus WH8102").is_none());
        assert!(registry.resolve("  ").is_none());
    }

    #[test]
    fn discovers_gff_files() {
        let temp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        std::fs::write(dir.join("genomic.gff"), "").unwrap();
        std::fs::write(dir.join("cyanorak.gff3.gz"), "").unwrap();
        std::fs::write(dir.join("gene_mapping.csv"), "").unwrap();

        let record = OrganismRecord::with_defaults("MED4", dir.clone());
        let files = record.annotation_files();
        assert_eq!(files, vec![dir.join("cyanorak.gff3.gz"), dir.join("genomic.gff")]);
    }
}
