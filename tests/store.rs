use camino::Utf8PathBuf;

use kira_gene_counts::domain::{AnnotationType, Portal};
use kira_gene_counts::matrix::{CountMatrix, PortalCounts};
use kira_gene_counts::store::Store;
use kira_gene_counts::taxon::TaxonRank;

#[test]
fn layout_paths() {
    let temp = tempfile::tempdir().unwrap();
    let store = Store::new(temp.path()).unwrap();

    let counts = store.count_table_path(AnnotationType::Signalp);
    assert!(counts.ends_with("Signalp_annotations_count_table.csv"));
    let norm = store.normalized_table_path(AnnotationType::Kog);
    assert!(norm.ends_with("KOG_annotations_count_table_norm.csv"));
    let genus = store.average_table_path(AnnotationType::Kegg, TaxonRank::Genus);
    assert!(genus.ends_with("KEGG_average_byGenus.csv"));
    assert!(genus.starts_with(store.root()));
}

#[test]
fn write_creates_missing_directories_and_replaces_files() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().join("nested").join("out")).unwrap();
    let store = Store::new_with_root(root);
    store.ensure_root().unwrap();
    let path = store.count_table_path(AnnotationType::Go);

    let first = CountMatrix::assemble(vec![PortalCounts {
        portal: Portal::new("Sp1"),
        counts: [("GO:1".to_string(), Some(2))].into_iter().collect(),
    }]);
    Store::write_csv_atomic(&path, &first).unwrap();
    let second = CountMatrix::assemble(vec![PortalCounts {
        portal: Portal::new("Sp2"),
        counts: [("GO:9".to_string(), Some(1))].into_iter().collect(),
    }]);
    Store::write_csv_atomic(&path, &second).unwrap();

    let written = std::fs::read_to_string(path.as_std_path()).unwrap();
    assert_eq!(written, "gene_id,Sp2\nGO:9,1\n");
    let leftovers = std::fs::read_dir(store.root().as_std_path())
        .unwrap()
        .count();
    assert_eq!(leftovers, 1);
}
