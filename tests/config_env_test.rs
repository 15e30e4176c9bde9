//! Integration tests for the GRAPHSCORE_* environment layer of Settings.
//!
//! Environment variables are process-wide: every test holds `ENV_LOCK` while its
//! variables are set, and they are removed again before the lock is released.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use rstest::rstest;
use tempfile::TempDir;

use graphscore::application::ApplicationError;
use graphscore::config::{local_config_path, Settings};
use graphscore::domain::ProximalBoundary;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Variables set for the lifetime of the guard.
struct ScopedEnv {
    keys: Vec<&'static str>,
    _lock: MutexGuard<'static, ()>,
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for key in &self.keys {
            env::remove_var(key);
        }
    }
}

fn scoped_env(vars: &[(&'static str, &str)]) -> ScopedEnv {
    let lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    for (key, value) in vars {
        env::set_var(key, value);
    }
    ScopedEnv {
        keys: vars.iter().map(|(key, _)| *key).collect(),
        _lock: lock,
    }
}

#[test]
fn given_nested_threshold_var_when_load_then_overrides_default() {
    let dir = TempDir::new().unwrap();
    let _env = scoped_env(&[
        ("GRAPHSCORE_QANADLI__MIN_OBSTRUCTION_THRESH", "0.3"),
        ("GRAPHSCORE_QANADLI__BOUNDARY", "inclusive"),
        ("GRAPHSCORE_MASTORA__USE_PERCENTAGE", "true"),
    ]);

    let settings = Settings::load(Some(dir.path())).expect("load settings");

    assert_eq!(settings.qanadli.min_obstruction_thresh, 0.3);
    assert_eq!(settings.qanadli.max_obstruction_thresh, 0.75);
    assert_eq!(settings.qanadli.boundary, ProximalBoundary::Inclusive);
    assert!(settings.mastora.use_percentage);
}

#[test]
fn given_graphs_dirs_list_when_load_then_split_on_commas() {
    let dir = TempDir::new().unwrap();
    let _env = scoped_env(&[("GRAPHSCORE_GRAPHS_DIRS", "/scans/a,/scans/b")]);

    let settings = Settings::load(Some(dir.path())).expect("load settings");

    assert_eq!(
        settings.graphs_dirs,
        vec![PathBuf::from("/scans/a"), PathBuf::from("/scans/b")]
    );
}

#[test]
fn given_attribute_name_vars_when_load_then_all_derived_names_follow() {
    let dir = TempDir::new().unwrap();
    let _env = scoped_env(&[
        ("GRAPHSCORE_ATTRIBUTES__INPUT_ATTR", "occupancy"),
        ("GRAPHSCORE_ATTRIBUTES__MAX_ATTR", "max_occupancy"),
        ("GRAPHSCORE_ATTRIBUTES__PROPAGATED_ATTR", "max_occupancy_propagated"),
        ("GRAPHSCORE_ATTRIBUTES__CUMULATED_ATTR", "max_occupancy_cumulated"),
        ("GRAPHSCORE_ATTRIBUTES__ROOT_OBSTRUCTION", "0.1"),
    ]);

    let names = Settings::load(Some(dir.path()))
        .expect("load settings")
        .derived_attributes();

    assert_eq!(names.input_attr, "occupancy");
    assert_eq!(
        names.score_attributes(),
        [
            "max_occupancy",
            "max_occupancy_propagated",
            "max_occupancy_cumulated"
        ]
    );
    assert_eq!(names.root_obstruction, 0.1);
}

#[test]
fn given_local_config_and_env_var_when_load_then_env_wins() {
    let dir = TempDir::new().unwrap();
    fs::write(
        local_config_path(dir.path()),
        "[qanadli]\nmax_obstruction_thresh = 0.8\n",
    )
    .unwrap();
    let _env = scoped_env(&[("GRAPHSCORE_QANADLI__MAX_OBSTRUCTION_THRESH", "0.9")]);

    let settings = Settings::load(Some(dir.path())).expect("load settings");

    assert_eq!(settings.qanadli.max_obstruction_thresh, 0.9);
}

#[rstest]
#[case("GRAPHSCORE_QANADLI__MIN_OBSTRUCTION_THRESH", "0,3")]
#[case("GRAPHSCORE_ATTRIBUTES__ROOT_OBSTRUCTION", "none")]
#[case("GRAPHSCORE_MASTORA__USE_PERCENTAGE", "maybe")]
#[case("GRAPHSCORE_QANADLI__BOUNDARY", "sideways")]
fn given_unparsable_var_when_load_then_config_error(
    #[case] key: &'static str,
    #[case] value: &str,
) {
    let dir = TempDir::new().unwrap();
    let _env = scoped_env(&[(key, value)]);

    let err = Settings::load(Some(dir.path())).unwrap_err();

    assert!(
        matches!(err, ApplicationError::Config { .. }),
        "expected a config error, got {err:?}"
    );
}
