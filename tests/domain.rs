use assert_matches::assert_matches;
use clap::ValueEnum;

use kira_gene_counts::domain::{AnnotationType, Portal};
use kira_gene_counts::error::KiraError;

#[test]
fn canonical_names_round_trip() {
    for kind in AnnotationType::ALL {
        let parsed: AnnotationType = kind.to_string().parse().unwrap();
        assert_eq!(parsed, kind);
    }
    assert_eq!(AnnotationType::InterPro.to_string(), "InterPro");
    assert_eq!(AnnotationType::Signalp.to_string(), "Signalp");
}

#[test]
fn key_columns() {
    assert_eq!(AnnotationType::Go.default_key_column(), "goAcc");
    assert_eq!(AnnotationType::Kegg.default_key_column(), "ecNum");
    assert_eq!(AnnotationType::InterPro.default_key_column(), "iprId");
    assert_eq!(AnnotationType::Kog.default_key_column(), "kogid");
    assert_eq!(AnnotationType::Signalp.default_key_column(), "proteinid");
}

#[test]
fn cli_values_are_lowercase() {
    let kind = <AnnotationType as ValueEnum>::from_str("interpro", false).unwrap();
    assert_eq!(kind, AnnotationType::InterPro);
    assert!(<AnnotationType as ValueEnum>::from_str("InterPro", false).is_err());
    assert_eq!(
        <AnnotationType as ValueEnum>::from_str("InterPro", true).unwrap(),
        AnnotationType::InterPro
    );
}

#[test]
fn unknown_type() {
    let err = "COG".parse::<AnnotationType>().unwrap_err();
    assert_matches!(err, KiraError::UnknownAnnotationType(value) if value == "COG");
}

#[test]
fn serde_uses_canonical_names() {
    let json = serde_json::to_string(&AnnotationType::Kegg).unwrap();
    assert_eq!(json, "\"KEGG\"");
    let kind: AnnotationType = serde_json::from_str("\"signalp\"").unwrap();
    assert_eq!(kind, AnnotationType::Signalp);
    let portal = serde_json::to_string(&Portal::new("Aspnid1")).unwrap();
    assert_eq!(portal, "\"Aspnid1\"");
}
