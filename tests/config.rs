use assert_matches::assert_matches;

use kira_gene_counts::config::{
    AnnotationTypeEntry, Config, ConfigLoader, DEFAULT_NORMALIZATION_TOTAL, default_portal_markers,
};
use kira_gene_counts::domain::AnnotationType;
use kira_gene_counts::error::KiraError;

#[test]
fn empty_config_resolves_to_defaults() {
    let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
    assert_eq!(resolved.schema_version, 1);
    assert_eq!(resolved.portal_markers, default_portal_markers());
    assert_eq!(resolved.normalization_total, DEFAULT_NORMALIZATION_TOTAL);
    assert_eq!(resolved.registry.key_column(AnnotationType::Kog), "kogid");
}

#[test]
fn entries_override_key_column_and_skip() {
    let config = Config {
        annotation_types: vec![AnnotationTypeEntry {
            name: AnnotationType::Signalp,
            key_column: Some("proteinId".to_string()),
            header_skip: Some(0),
        }],
        ..Config::default()
    };
    let resolved = ConfigLoader::resolve_config(config).unwrap();
    assert_eq!(resolved.registry.key_column(AnnotationType::Signalp), "proteinId");
    assert_eq!(resolved.registry.header_skip(AnnotationType::Signalp), 0);
    assert_eq!(resolved.registry.key_column(AnnotationType::Go), "goAcc");
}

#[test]
fn rejects_non_positive_total() {
    let config = Config {
        normalization_total: Some(0.0),
        ..Config::default()
    };
    let err = ConfigLoader::resolve_config(config).unwrap_err();
    assert_matches!(err, KiraError::InvalidConfig(_));
}

#[test]
fn rejects_unknown_schema_version() {
    let config = Config {
        schema_version: Some(2),
        ..Config::default()
    };
    assert_matches!(
        ConfigLoader::resolve_config(config),
        Err(KiraError::InvalidConfig(_))
    );
}

#[test]
fn resolve_reads_json_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("kira-gc.json");
    std::fs::write(
        &path,
        r#"{
            "annotation_types": [{ "name": "KEGG", "key_column": "ec_number" }],
            "portal_markers": ["GeneCatalog", "proteins"],
            "normalization_total": 1000000
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.registry.key_column(AnnotationType::Kegg), "ec_number");
    assert_eq!(resolved.portal_markers, vec!["GeneCatalog", "proteins"]);
    assert_eq!(resolved.normalization_total, 1_000_000.0);
}

#[test]
fn resolve_rejects_unknown_type_name() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("bad.json");
    std::fs::write(&path, r#"{ "annotation_types": [{ "name": "Pfam" }] }"#).unwrap();
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(KiraError::ConfigParse(_))
    );
}

#[test]
fn explicit_missing_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(KiraError::ConfigRead(_))
    );
}
