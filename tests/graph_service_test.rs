//! Tests for GraphService: graph resolution by patient ID and node-link loading.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use graphscore::application::services::{GraphService, ScoreRequest, ScoringService};
use graphscore::application::ApplicationError;
use graphscore::config::Settings;
use graphscore::domain::{DomainError, MastoraConfig, QanadliConfig};
use graphscore::infrastructure::traits::RealFileSystem;
use graphscore::util::testing;

const FIXTURE: &str = "0055_graph_ep_transversal_obstruction.json";

fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/resources/graphs")
}

fn service(graphs_dirs: Vec<PathBuf>) -> GraphService {
    testing::init_test_setup();
    let settings = Settings {
        graphs_dirs,
        ..Settings::default()
    };
    GraphService::new(Arc::new(RealFileSystem), Arc::new(settings))
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-12,
        "expected {expected}, got {actual}"
    );
}

// ============================================================
// resolve()
// ============================================================

#[test]
fn given_unpadded_patient_id_when_resolve_then_finds_padded_file() {
    let graphs = service(vec![fixture_dir()]);
    let path = graphs.resolve("55").unwrap();
    assert_eq!(path, fixture_dir().join(FIXTURE));
}

#[test]
fn given_existing_path_when_resolve_then_used_as_is() {
    let graphs = service(vec![]);
    let direct = fixture_dir().join(FIXTURE);
    let path = graphs.resolve(direct.to_str().unwrap()).unwrap();
    assert_eq!(path, direct);
}

#[test]
fn given_several_dirs_when_resolve_then_first_match_wins() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    fs::write(second.path().join("0007_graph_ep_transversal_obstruction.json"), "{}").unwrap();
    fs::write(first.path().join("0007_graph_ep_transversal_obstruction.json"), "{}").unwrap();

    let graphs = service(vec![first.path().to_path_buf(), second.path().to_path_buf()]);
    let path = graphs.resolve("7").unwrap();
    assert!(path.starts_with(first.path()));
}

#[test]
fn given_unknown_patient_when_resolve_then_graph_not_found_lists_tried_paths() {
    let empty = TempDir::new().unwrap();
    let graphs = service(vec![empty.path().to_path_buf(), fixture_dir()]);

    let err = graphs.resolve("99").unwrap_err();
    match err {
        ApplicationError::GraphNotFound { patient_id, tried } => {
            assert_eq!(patient_id, "0099");
            assert_eq!(tried.len(), 2);
            assert!(tried[0].ends_with("0099_graph_ep_transversal_obstruction.json"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

// ============================================================
// load() / load_derived()
// ============================================================

#[test]
fn given_fixture_when_load_derived_then_all_path_attributes_present() {
    let graphs = service(vec![fixture_dir()]);
    let tree = graphs.load_derived(&fixture_dir().join(FIXTURE)).unwrap();

    assert_eq!(tree.node_count(), 9);
    assert_eq!(tree.edge_count(), 8);

    let names = graphs.settings().derived_attributes();
    let s7 = tree.find("7").unwrap();
    assert_close(tree.obstruction(s7, &names.max_attr).unwrap(), 0.0);
    // path: 0.1 -> 0.8 -> 0.0
    assert_close(tree.obstruction(s7, &names.propagated_attr).unwrap(), 0.8);
    assert_close(tree.obstruction(s7, &names.cumulated_attr).unwrap(), 0.82);
}

#[test]
fn given_invalid_json_when_load_then_invalid_graph_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{\"nodes\": [").unwrap();

    let err = service(vec![]).load(&path).unwrap_err();
    assert!(matches!(err, ApplicationError::InvalidGraphFile { .. }));
}

#[test]
fn given_node_with_two_parents_when_load_then_malformed_tree() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dag.json");
    let graph = r#"{"nodes": [{"id": 0}, {"id": 1}, {"id": 2}, {"id": 3}],
                    "links": [{"source": 0, "target": 1}, {"source": 0, "target": 2},
                              {"source": 1, "target": 3}, {"source": 2, "target": 3}]}"#;
    fs::write(&path, graph).unwrap();

    let err = service(vec![]).load(&path).unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::MalformedTree(_))
    ));
}

#[test]
fn given_missing_file_when_load_then_operation_failed() {
    let err = service(vec![])
        .load(Path::new("/nonexistent/graph.json"))
        .unwrap_err();
    assert!(matches!(err, ApplicationError::OperationFailed { .. }));
}

// ============================================================
// ScoringService on the fixture
// ============================================================

#[test]
fn given_fixture_when_scored_by_patient_id_then_expected_scores() {
    let scoring = ScoringService::new(service(vec![fixture_dir()]));

    let qanadli = ScoreRequest::Qanadli(QanadliConfig::default());
    let report = scoring.score_input("55", &qanadli).unwrap();
    assert_close(report.score, 0.75);
    assert_eq!(report.total_weight, 4);

    let mastora = ScoreRequest::Mastora(MastoraConfig::default());
    let report = scoring.score_input("0055", &mastora).unwrap();
    assert_close(report.score, 17.0 / 40.0);

    let percentage = ScoreRequest::Mastora(MastoraConfig {
        use_percentage: true,
        ..MastoraConfig::default()
    });
    let report = scoring.score_input("55", &percentage).unwrap();
    assert_close(report.score, 3.0 / 8.0);
}

#[test]
fn given_propagated_attribute_when_scored_then_downstream_edges_inherit_obstruction() {
    let scoring = ScoringService::new(service(vec![fixture_dir()]));
    let attr = scoring.graphs().settings().attributes.propagated_attr.clone();

    let request = ScoreRequest::Mastora(MastoraConfig::default()).with_attr(&attr);
    let report = scoring.score_input("55", &request).unwrap();
    assert_eq!(report.obstruction_attr, attr);
    // degrees: 1 1 4 2 2 4 4 4
    assert_close(report.score, 22.0 / 40.0);
}

#[test]
fn given_graph_without_transversal_obstruction_when_scoring_other_attribute_then_scored() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("occupancy.json");
    let graph = r#"{"nodes": [{"id": 0, "level": 1}, {"id": 1, "level": 4}],
                    "links": [{"source": 0, "target": 1, "ep_vessels_occupancy": 0.6}]}"#;
    fs::write(&path, graph).unwrap();
    let scoring = ScoringService::new(service(vec![]));

    let request =
        ScoreRequest::Mastora(MastoraConfig::default()).with_attr("ep_vessels_occupancy");
    let report = scoring.score_file(&path, &request).unwrap();
    assert_close(report.score, 0.6);

    // the derived attributes were never written
    let derived = ScoreRequest::Mastora(MastoraConfig::default());
    let err = scoring.score_file(&path, &derived).unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::AttributeMissing { ref attribute, .. })
            if attribute == "max_transversal_obstruction"
    ));
}
