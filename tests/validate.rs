use std::fs;

use camino::Utf8PathBuf;
use tempfile::TempDir;

use kira_locus_reconcile::config::AnalysisDeclaration;
use kira_locus_reconcile::domain::{DiagnosticStatus, Strategy};
use kira_locus_reconcile::gene_index::StaticGeneIndex;
use kira_locus_reconcile::heuristics::Rules;
use kira_locus_reconcile::registry::{OrganismRecord, OrganismRegistry};
use kira_locus_reconcile::validate::DiagnosticValidator;

const ORGANISM: &str = "Prochlorococcus MED4";

struct Fixture {
    _temp: TempDir,
    root: Utf8PathBuf,
    registry: OrganismRegistry,
}

fn fixture() -> Fixture {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    fs::create_dir_all(root.join("MED4")).unwrap();
    let registry = OrganismRegistry::new([OrganismRecord::with_defaults(
        ORGANISM,
        root.join("MED4"),
    )]);
    Fixture {
        _temp: temp,
        root,
        registry,
    }
}

impl Fixture {
    fn table(&self, name: &str, content: &str) -> AnalysisDeclaration {
        let path = self.root.join(name);
        fs::write(&path, content).unwrap();
        AnalysisDeclaration {
            id: name.to_string(),
            paper: "Jones 2019".to_string(),
            organism: "MED4".to_string(),
            table: path,
            name_col: "Gene".to_string(),
            effect_size_col: None,
            significance_col: None,
            skip_rows: 0,
        }
    }
}

fn ids(prefix: &str, count: usize) -> Vec<String> {
    (1..=count).map(|n| format!("{prefix}{n:04}")).collect()
}

fn index(genes: &[String]) -> StaticGeneIndex {
    let mut index = StaticGeneIndex::default();
    index.insert(ORGANISM, genes.iter().cloned());
    index
}

fn single_column(ids: &[String]) -> String {
    let mut content = "Gene,logFC\n".to_string();
    for (n, id) in ids.iter().enumerate() {
        content.push_str(&format!("{id},{}.5\n", n % 3));
    }
    content
}

#[test]
fn nine_of_ten_is_a_match() {
    let fixture = fixture();
    let sample = ids("PMM", 10);
    let analysis = fixture.table("s1.csv", &single_column(&sample));
    let index = index(&sample[..9]);
    let rules = Rules::default();

    let result = DiagnosticValidator::new(&fixture.registry, &index, &rules).validate(&analysis);
    assert_eq!(result.status, DiagnosticStatus::Match);
    assert_eq!(result.strategy, None);
    assert!((result.match_rate - 0.9).abs() < 1e-9);
    assert_eq!(result.organism, ORGANISM);
    assert_eq!(result.sample.len(), 5);
}

#[test]
fn unloaded_organism_needs_loading() {
    let fixture = fixture();
    let analysis = fixture.table("s1.csv", &single_column(&ids("PMM", 10)));
    let index = StaticGeneIndex::default();
    let rules = Rules::default();

    let result = DiagnosticValidator::new(&fixture.registry, &index, &rules).validate(&analysis);
    assert_eq!(result.status, DiagnosticStatus::NoMatch);
    assert_eq!(result.strategy, Some(Strategy::LoadOrganism));
    assert_eq!(result.match_rate, 0.0);
}

#[test]
fn unregistered_organism_needs_loading() {
    let fixture = fixture();
    let mut analysis = fixture.table("s1.csv", &single_column(&ids("PMM", 10)));
    analysis.organism = "Synechococcus WH8102".to_string();
    let index = index(&ids("PMM", 10));
    let rules = Rules::default();

    let result = DiagnosticValidator::new(&fixture.registry, &index, &rules).validate(&analysis);
    assert_eq!(result.strategy, Some(Strategy::LoadOrganism));
    assert_eq!(result.organism, "Synechococcus WH8102");
}

#[test]
fn another_column_holds_loaded_ids() {
    let fixture = fixture();
    let genes = ids("PMM", 10);
    let mut content = "Gene,Locus,logFC\n".to_string();
    for (n, gene) in genes.iter().enumerate() {
        content.push_str(&format!("sym{n},{gene},1.0\n"));
    }
    let analysis = fixture.table("s2.csv", &content);
    let index = index(&genes);
    let rules = Rules::default();

    let result = DiagnosticValidator::new(&fixture.registry, &index, &rules).validate(&analysis);
    assert_eq!(result.status, DiagnosticStatus::NoMatch);
    assert_eq!(result.strategy, Some(Strategy::ChangeNameCol));
    assert_eq!(result.suggestion.as_deref(), Some("Locus"));
}

#[test]
fn master_table_aliases_suggest_mapping() {
    let fixture = fixture();
    let old = ids("PMM", 6);
    let current = ids("PMM_RS", 6);
    let mut master = "locus_tag,gene,old_locus_tags\n".to_string();
    for (tag, old_tag) in current.iter().zip(&old) {
        master.push_str(&format!("{tag},g{},{old_tag}\n", &tag[7..]));
    }
    fs::write(fixture.root.join("MED4/gene_mapping.csv"), master).unwrap();

    // One old tag is also a loaded gene id, so the match is partial.
    let mut genes = current.clone();
    genes.push(old[0].clone());
    let analysis = fixture.table("s3.csv", &single_column(&old));
    let index = index(&genes);
    let rules = Rules::default();

    let result = DiagnosticValidator::new(&fixture.registry, &index, &rules).validate(&analysis);
    assert_eq!(result.status, DiagnosticStatus::PartialMatch);
    assert_eq!(result.strategy, Some(Strategy::CreateMappingCsv));
    assert_eq!(result.suggestion.as_deref(), Some("old_locus_tags"));
}

#[test]
fn annotation_attributes_suggest_gff_mapping() {
    let fixture = fixture();
    let old = ids("PMM", 4);
    let mut gff = "##gff-version 3\n".to_string();
    for (n, old_tag) in old.iter().enumerate() {
        gff.push_str(&format!(
            "NC_005072.1\tRefSeq\tgene\t{}\t{}\t.\t+\t.\tID=gene-TX50_RS{n:05};old_locus_tag={old_tag}\n",
            n * 1000 + 1,
            n * 1000 + 900
        ));
    }
    fs::write(fixture.root.join("MED4/genomic.gff"), gff).unwrap();

    let analysis = fixture.table("s4.csv", &single_column(&old));
    let index = index(&ids("TX50_RS", 4));
    let rules = Rules::default();

    let result = DiagnosticValidator::new(&fixture.registry, &index, &rules).validate(&analysis);
    assert_eq!(result.status, DiagnosticStatus::NoMatch);
    assert_eq!(result.strategy, Some(Strategy::CreateMappingGff));
    assert_eq!(result.suggestion.as_deref(), Some("old_locus_tag"));
}

#[test]
fn unrelated_identifiers_fall_through() {
    let fixture = fixture();
    let analysis = fixture.table("s5.csv", &single_column(&ids("contig", 8)));
    let index = index(&ids("PMM", 8));
    let rules = Rules::default();

    let result = DiagnosticValidator::new(&fixture.registry, &index, &rules).validate(&analysis);
    assert_eq!(result.status, DiagnosticStatus::NoMatch);
    assert_eq!(result.strategy, Some(Strategy::UnrelatedIds));
}

#[test]
fn unusable_tables_are_errors() {
    let fixture = fixture();
    let index = index(&ids("PMM", 3));
    let rules = Rules::default();
    let mut validator = DiagnosticValidator::new(&fixture.registry, &index, &rules);

    let mut missing_column = fixture.table("s6.csv", "Locus,logFC\nPMM0001,1.0\n");
    missing_column.name_col = "Gene".to_string();
    let result = validator.validate(&missing_column);
    assert_eq!(result.status, DiagnosticStatus::Error);
    assert!(result.explanation.contains("Locus, logFC"));

    let only_rna = fixture.table("s7.csv", "Gene,logFC\ntRNA-Leu,1.0\nrrnA_16S,2.0\nnan,0\n");
    let result = validator.validate(&only_rna);
    assert_eq!(result.status, DiagnosticStatus::Error);
    assert_eq!(result.explanation, "no valid identifiers");

    let mut absent = fixture.table("s8.csv", "Gene\nPMM0001\n");
    absent.table = fixture.root.join("does-not-exist.csv");
    let result = validator.validate(&absent);
    assert_eq!(result.status, DiagnosticStatus::Error);
}
