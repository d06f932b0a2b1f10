use std::fs;

use assert_matches::assert_matches;
use camino::{Utf8Path, Utf8PathBuf};

use kira_locus_reconcile::config::{Config, ConfigLoader, OrganismEntry, OrganismEntryObject};
use kira_locus_reconcile::error::ReconcileError;
use kira_locus_reconcile::heuristics::AliasSplit;

fn parse(json: &str) -> Result<kira_locus_reconcile::config::ResolvedConfig, ReconcileError> {
    let config: Config = serde_json::from_str(json).unwrap();
    ConfigLoader::resolve_config(config, Utf8Path::new("/data"))
}

#[test]
fn detailed_organism_entry() {
    let mut config: Config = serde_json::from_str("{}").unwrap();
    config.organisms.insert(
        "Synechococcus WH8102".to_string(),
        OrganismEntry::Detailed(OrganismEntryObject {
            directory: "/genomes/WH8102".to_string(),
            master_table: Some("mapping/ids.tsv".to_string()),
            gene_index: None,
            annotations: Some(vec!["genomic.gff.gz".to_string()]),
        }),
    );

    let resolved = ConfigLoader::resolve_config(config, Utf8Path::new("/data")).unwrap();
    assert_eq!(resolved.output_dir, Utf8PathBuf::from("/data/reconciled"));
    assert!(resolved.analyses.is_empty());
    let record = resolved.registry.resolve("wh8102").unwrap();
    assert_eq!(record.directory, Utf8PathBuf::from("/genomes/WH8102"));
    assert_eq!(
        record.master_table,
        Utf8PathBuf::from("/genomes/WH8102/mapping/ids.tsv")
    );
    assert_eq!(
        record.gene_index,
        Utf8PathBuf::from("/genomes/WH8102/gene_index.txt")
    );
    assert_eq!(
        record.annotation_files(),
        vec![Utf8PathBuf::from("/genomes/WH8102/genomic.gff.gz")]
    );
}

#[test]
fn heuristics_overrides_merge_with_defaults() {
    let resolved = parse(
        r#"{
            "heuristics": {
                "match_threshold": 0.9,
                "alias_columns": [{ "name": "synonyms", "split": "comma" }]
            }
        }"#,
    )
    .unwrap();
    let heuristics = &resolved.rules.heuristics;
    assert_eq!(heuristics.match_threshold, 0.9);
    assert_eq!(heuristics.fallback_threshold, 0.5);
    assert_eq!(heuristics.alias_columns.len(), 1);
    assert_eq!(heuristics.alias_columns[0].split, AliasSplit::Comma);
    assert!(resolved.rules.is_non_coding("tRNA-Gly"));
}

#[test]
fn analysis_ids_default_per_paper() {
    let resolved = parse(
        r#"{
            "papers": [
                { "name": "Lin et al. (2016)", "analyses": [
                    { "organism": "MED4", "table": "a.csv", "name_col": "Gene" },
                    { "organism": "MED4", "table": "/abs/b.tsv", "name_col": "ORF", "skip_rows": 3 }
                ]}
            ]
        }"#,
    )
    .unwrap();
    assert_eq!(resolved.analyses[0].id, "lin_et_al_2016_1");
    assert_eq!(resolved.analyses[1].id, "lin_et_al_2016_2");
    assert_eq!(resolved.analyses[1].table, Utf8PathBuf::from("/abs/b.tsv"));
    assert_eq!(resolved.analyses[1].skip_rows, 3);
    assert_eq!(resolved.analyses[0].paper, "Lin et al. (2016)");
}

#[test]
fn rejects_invalid_declarations() {
    let duplicate = parse(
        r#"{ "papers": [ { "name": "P", "analyses": [
            { "id": "x", "organism": "MED4", "table": "a.csv", "name_col": "Gene" },
            { "id": "x", "organism": "MED4", "table": "b.csv", "name_col": "Gene" }
        ]}]}"#,
    );
    assert_matches!(duplicate, Err(ReconcileError::InvalidConfig(_)));

    let empty_column = parse(
        r#"{ "papers": [ { "name": "P", "analyses": [
            { "organism": "MED4", "table": "a.csv", "name_col": " " }
        ]}]}"#,
    );
    assert_matches!(empty_column, Err(ReconcileError::InvalidConfig(_)));

    let version = parse(r#"{ "schema_version": 2 }"#);
    assert_matches!(version, Err(ReconcileError::InvalidConfig(_)));

    let threshold = parse(r#"{ "heuristics": { "match_threshold": 1.5 } }"#);
    assert_matches!(threshold, Err(ReconcileError::InvalidConfig(_)));

    let pattern = parse(r#"{ "heuristics": { "non_coding_patterns": ["(unclosed"] } }"#);
    assert_matches!(pattern, Err(ReconcileError::InvalidPattern { .. }));
}

#[test]
fn loads_from_file_relative_to_config_dir() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let path = root.join("kira-lr.json");
    fs::write(
        &path,
        r#"{ "output_dir": "results", "organisms": { "MED4": "genomes/MED4" } }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(Some(path.as_str())).unwrap();
    assert_eq!(resolved.output_dir, root.join("results"));
    assert_eq!(resolved.registry.len(), 1);

    let missing = ConfigLoader::resolve(Some(root.join("absent.json").as_str()));
    assert_matches!(missing, Err(ReconcileError::ConfigRead(_)));

    fs::write(&path, "{ not json").unwrap();
    let broken = ConfigLoader::resolve(Some(path.as_str()));
    assert_matches!(broken, Err(ReconcileError::ConfigParse(_)));
}
