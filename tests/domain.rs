use assert_matches::assert_matches;

use kira_evidence::domain::{OntologyId, PageWindow};
use kira_evidence::error::KiraError;

#[test]
fn parse_ontology_ids_from_common_vocabularies() {
    for value in ["EFO_0000305", "MONDO_0004992", "Orphanet_1234", "HP_0001250", "DOID_1612"] {
        let id: OntologyId = value.parse().unwrap();
        assert_eq!(id.as_str(), value);
    }
}

#[test]
fn parse_ontology_id_invalid() {
    let err = "EFO:0000305".parse::<OntologyId>().unwrap_err();
    assert_matches!(err, KiraError::InvalidOntologyId(_));
}

#[test]
fn ontology_id_serde_round_trips_as_string() {
    let id: OntologyId = serde_json::from_str("\"EFO_0000305\"").unwrap();
    assert_eq!(serde_json::to_string(&id).unwrap(), "\"EFO_0000305\"");
    assert!(serde_json::from_str::<OntologyId>("\"bogus\"").is_err());
}

#[test]
fn first_window_starts_at_zero() {
    let window = PageWindow::first(500);
    assert_eq!(window.index, 0);
    assert_eq!(window.next().index, 1);
    assert_eq!(window.next().size, 500);
}
