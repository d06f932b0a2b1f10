use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ReconcileError;
use crate::heuristics::{AliasSplit, Heuristics};
use crate::table::Table;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasCollision {
    pub alias: String,
    pub previous: String,
    pub current: String,
    pub column: String,
}

/// Alias → locus tag map plus the set of valid locus tags for one organism.
///
/// When two genes share an alias the later row wins; every such overwrite is kept in
/// `collisions` so it can be reported.
#[derive(Debug, Clone, Default)]
pub struct CanonicalLookup {
    locus_tags: HashSet<String>,
    aliases: HashMap<String, String>,
    by_column: BTreeMap<String, HashMap<String, String>>,
    collisions: Vec<AliasCollision>,
}

impl CanonicalLookup {
    pub fn from_table(table: &Table, heuristics: &Heuristics) -> Result<Self, ReconcileError> {
        let key_idx = table.column_index(&heuristics.locus_tag_column)?;
        let columns = heuristics
            .alias_columns
            .iter()
            .filter_map(|column| match table.find_column(&column.name) {
                Some(idx) => Some((idx, column)),
                None => {
                    debug!(column = %column.name, table = %table.name, "alias column absent");
                    None
                }
            })
            .collect::<Vec<_>>();

        let mut lookup = Self::default();
        for row in 0..table.rows.len() {
            let key = table.cell(row, key_idx).trim();
            if heuristics.is_missing(key) {
                continue;
            }
            lookup.add_locus_tag(key);
            for (idx, column) in &columns {
                let cell = table.cell(row, *idx);
                for token in split_aliases(cell, column.split) {
                    if heuristics.is_missing(token) {
                        continue;
                    }
                    lookup.insert_alias(key, &column.name, token);
                }
            }
        }
        Ok(lookup)
    }

    pub fn add_locus_tag(&mut self, locus_tag: &str) {
        self.locus_tags.insert(locus_tag.to_string());
    }

    pub fn insert_alias(&mut self, locus_tag: &str, column: &str, alias: &str) {
        let alias = alias.trim();
        if alias.is_empty() {
            return;
        }
        if let Some(previous) = self.aliases.insert(alias.to_string(), locus_tag.to_string()) {
            if previous != locus_tag {
                self.collisions.push(AliasCollision {
                    alias: alias.to_string(),
                    previous,
                    current: locus_tag.to_string(),
                    column: column.to_string(),
                });
            }
        }
        self.by_column
            .entry(column.to_string())
            .or_default()
            .insert(alias.to_string(), locus_tag.to_string());
    }

    pub fn contains_locus_tag(&self, id: &str) -> bool {
        self.locus_tags.contains(id)
    }

    pub fn alias(&self, id: &str) -> Option<&str> {
        self.aliases.get(id).map(String::as_str)
    }

    pub fn locus_tags(&self) -> &HashSet<String> {
        &self.locus_tags
    }

    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    pub fn column_lookups(&self) -> &BTreeMap<String, HashMap<String, String>> {
        &self.by_column
    }

    pub fn collisions(&self) -> &[AliasCollision] {
        &self.collisions
    }

    pub fn is_empty(&self) -> bool {
        self.locus_tags.is_empty()
    }
}

/// Loads the organism's master identifier table. Absence is normal for organisms
/// without prior annotation, so failures are logged and yield `None`.
pub fn build_lookup(path: &Path, heuristics: &Heuristics) -> Option<CanonicalLookup> {
    if !path.exists() {
        warn!(path = %path.display(), "master identifier table not found");
        return None;
    }
    let table = match Table::read(path, 0) {
        Ok(table) => table,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read master identifier table");
            return None;
        }
    };
    match CanonicalLookup::from_table(&table, heuristics) {
        Ok(lookup) => {
            if !lookup.collisions().is_empty() {
                warn!(
                    path = %path.display(),
                    collisions = lookup.collisions().len(),
                    "aliases shared by several locus tags; later rows take precedence"
                );
                for collision in lookup.collisions().iter().take(5) {
                    debug!(
                        alias = %collision.alias,
                        previous = %collision.previous,
                        current = %collision.current,
                        column = %collision.column,
                        "alias collision"
                    );
                }
            }
            debug!(
                path = %path.display(),
                locus_tags = lookup.locus_tags().len(),
                aliases = lookup.alias_count(),
                "built canonical lookup"
            );
            Some(lookup)
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "unusable master identifier table");
            None
        }
    }
}

fn split_aliases(cell: &str, split: AliasSplit) -> Vec<&str> {
    match split {
        AliasSplit::Scalar => vec![cell.trim()],
        AliasSplit::Space => cell.split_whitespace().collect(),
        AliasSplit::Comma => cell.split(',').map(str::trim).collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn master(text: &str) -> Table {
        Table::from_reader(
            Path::new("gene_mapping.csv"),
            "gene_mapping.csv",
            Cursor::new(text.as_bytes().to_vec()),
            0,
            Some(b','),
        )
        .unwrap()
    }

    #[test]
    fn flattens_alias_columns() {
        let table = master(
            "locus_tag,gene_names,old_locus_tags,protein_id\n\
             PMM0001,dnaN otherName,\"OLD1, OLD2\",WP_011129870.1\n\
             PMM0002,nan,,\n",
        );
        let lookup = CanonicalLookup::from_table(&table, &Heuristics::default()).unwrap();

        assert!(lookup.contains_locus_tag("PMM0001"));
        assert!(lookup.contains_locus_tag("PMM0002"));
        assert_eq!(lookup.alias("dnaN"), Some("PMM0001"));
        assert_eq!(lookup.alias("otherName"), Some("PMM0001"));
        assert_eq!(lookup.alias("OLD2"), Some("PMM0001"));
        assert_eq!(lookup.alias("WP_011129870.1"), Some("PMM0001"));
        assert_eq!(lookup.alias("nan"), None);
        assert_eq!(lookup.alias_count(), 5);
        assert_eq!(
            lookup.column_lookups()["old_locus_tags"].get("OLD1"),
            Some(&"PMM0001".to_string())
        );
    }

    #[test]
    fn later_rows_win_and_collisions_are_recorded() {
        let table = master(
            "locus_tag,gene\n\
             PMM0001,psbA\n\
             PMM0002,psbA\n\
             PMM0003,psbD\n",
        );
        let lookup = CanonicalLookup::from_table(&table, &Heuristics::default()).unwrap();

        assert_eq!(lookup.alias("psbA"), Some("PMM0002"));
        assert_eq!(
            lookup.collisions(),
            &[AliasCollision {
                alias: "psbA".to_string(),
                previous: "PMM0001".to_string(),
                current: "PMM0002".to_string(),
                column: "gene".to_string(),
            }]
        );
    }

    #[test]
    fn same_gene_repeated_alias_is_not_a_collision() {
        let table = master("locus_tag,gene,gene_names\nPMM0001,dnaN,dnaN\n");
        let lookup = CanonicalLookup::from_table(&table, &Heuristics::default()).unwrap();
        assert!(lookup.collisions().is_empty());
    }

    #[test]
    fn missing_master_table_yields_none() {
        let temp = tempfile::tempdir().unwrap();
        let lookup = build_lookup(&temp.path().join("absent.csv"), &Heuristics::default());
        assert!(lookup.is_none());
    }

    #[test]
    fn master_table_without_key_column_yields_none() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("gene_mapping.csv");
        std::fs::write(&path, "gene,protein_id\ndnaN,WP_1.1\n").unwrap();
        assert!(build_lookup(&path, &Heuristics::default()).is_none());
    }
}
