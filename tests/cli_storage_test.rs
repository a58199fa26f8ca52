//! Integration tests for per-user storage, reset and recovery from bad data.

mod common;

use common::TestEnv;
use mandala::storage::sqlite::DB_FILE;
use mandala::storage::{CHART_VIEW_KEY, KeyValueBackend, MAJOR_CELLS_KEY, SqliteBackend};
use predicates::prelude::*;

#[test]
fn test_users_have_separate_charts() {
    let env = TestEnv::new();
    env.title("center", "Mine");

    let output = env
        .mandala()
        .args(["--user", "someone-else"])
        .assert()
        .success();
    let summary: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(summary["center_goal"], "");

    assert_ne!(env.storage_dir(), env.storage_dir_for("someone-else"));
    assert!(env.storage_dir().join(DB_FILE).exists());
    assert!(!env.storage_dir_for("someone-else").join("config.kdl").exists());
}

#[test]
fn test_invalid_user_is_rejected() {
    let env = TestEnv::new();
    env.mandala()
        .args(["--user", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_reset_removes_chart() {
    let env = TestEnv::new();
    env.title("major-1", "Revenue 1000");
    env.json(&["open", "major-1"]);

    let result = env.json(&["reset"]);
    assert_eq!(result["removed_keys"], 6);

    let summary = env.json(&[]);
    assert_eq!(summary["majors"][0]["title"], "");
    assert_eq!(summary["view"], "major");
    assert_eq!(
        env.json(&["targets", "list"])["yearly_targets"]
            .as_array()
            .unwrap()
            .len(),
        0
    );

    assert_eq!(env.json(&["reset"])["removed_keys"], 0);
}

#[test]
fn test_corrupt_values_fall_back_to_defaults() {
    let env = TestEnv::new();
    env.title("center", "Keep me");
    env.json(&["open", "major-2"]);

    {
        let mut backend = SqliteBackend::open(&env.storage_dir()).unwrap();
        backend.set(MAJOR_CELLS_KEY, "{not json").unwrap();
        backend.set(CHART_VIEW_KEY, "42").unwrap();
    }

    let summary = env.json(&[]);
    assert_eq!(summary["center_goal"], "Keep me");
    assert_eq!(summary["majors"].as_array().unwrap().len(), 8);
    assert_eq!(summary["majors"][7]["id"], "major-8");
    assert_eq!(summary["view"], "major");

    // The chart stays usable and rewrites the damaged key
    env.title("major-2", "Health");
    let backend = SqliteBackend::open(&env.storage_dir()).unwrap();
    let stored = backend.get(MAJOR_CELLS_KEY).unwrap().unwrap();
    assert!(stored.contains("Health"));
}
