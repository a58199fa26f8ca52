//! Integration tests for yearly targets, actuals and title extraction.

mod common;

use common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_major_title_syncs_targets() {
    let env = TestEnv::new();
    let result = env.title("major-1", "Revenue 1000");
    assert_eq!(result["level"], "major");

    let targets = result["yearlyTargets"].as_array().unwrap();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0]["goalId"], "major-1");
    assert_eq!(targets[0]["goalTitle"], "Revenue 1000");
    assert_eq!(targets[0]["type"], "revenue");
    assert_eq!(targets[0]["revenueTarget"], 1000);

    let events = result["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["type"], "yearly-targets-updated");

    let listed = env.json(&["targets", "list"]);
    assert_eq!(listed["yearly_targets"], result["yearlyTargets"]);
    assert_eq!(listed["events"].as_array().unwrap().len(), 0);
}

#[test]
fn test_minor_title_does_not_sync() {
    let env = TestEnv::new();
    let result = env.title("major-1-middle-1-minor-1", "売上1億円");
    assert_eq!(result["level"], "minor");
    assert!(result.get("yearlyTargets").is_none());
    assert_eq!(result["events"].as_array().unwrap().len(), 0);

    let listed = env.json(&["targets", "list"]);
    assert_eq!(listed["yearly_targets"].as_array().unwrap().len(), 0);
}

#[test]
fn test_targets_sync_covers_every_titled_major() {
    let env = TestEnv::new();
    env.title("major-2", "利益500万円");
    env.title("major-5", "Be kind");

    let result = env.json(&["targets", "sync"]);
    let targets = result["yearly_targets"].as_array().unwrap();
    assert_eq!(targets.len(), 2);
    assert_eq!(targets[0]["goalId"], "major-2");
    assert_eq!(targets[0]["type"], "profit");
    assert_eq!(targets[0]["profitTarget"], 5_000_000);
    assert_eq!(targets[1]["goalId"], "major-5");
    assert_eq!(targets[1]["type"], "custom");
    assert!(targets[1].get("revenueTarget").is_none());
    assert_eq!(result["events"][0]["type"], "yearly-targets-updated");
}

#[test]
fn test_actuals_check_met_leaves() {
    let env = TestEnv::new();
    env.title("major-1-middle-1-minor-1", "売上1億円");
    env.title("major-1-middle-1-minor-2", "売上2億円");
    env.title("major-1-middle-2-minor-1", "営業利益1000万円");

    let result = env.json(&[
        "actuals",
        "--year",
        "2024",
        "--revenue",
        "150000000",
        "--operating-profit",
        "10000000",
    ]);
    assert_eq!(result["year"], 2024);
    assert_eq!(result["changed"], true);
    assert_eq!(
        result["checked"],
        serde_json::json!(["major-1-middle-1-minor-1", "major-1-middle-2-minor-1"])
    );

    let events = result["events"].as_array().unwrap();
    assert_eq!(events.last().unwrap()["type"], "mandala-updated");
    assert_eq!(events.last().unwrap()["year"], 2024);
    assert!(
        events
            .iter()
            .filter(|e| e["type"] == "goal-achieved")
            .all(|e| e["level"] == "minor")
    );

    // Already-checked leaves are left alone
    let again = env.json(&["actuals", "--year", "2024", "--revenue", "150000000"]);
    assert_eq!(again["changed"], false);
    assert_eq!(again["events"].as_array().unwrap().len(), 0);

    let summary = env.json(&[]);
    assert_eq!(summary["checked_leaves"], 2);
}

#[test]
fn test_gross_profit_is_not_compared() {
    let env = TestEnv::new();
    env.title("major-1-middle-1-minor-1", "粗利100万円");

    let result = env.json(&["actuals", "--year", "2024", "--gross-profit", "999999999"]);
    assert_eq!(result["changed"], false);
    assert_eq!(result["actuals"]["grossProfitActual"], 999_999_999);

    env.mandala()
        .args(["-H", "actuals", "--year", "2024", "--gross-profit", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gross profit is not compared"));
}

#[test]
fn test_actuals_year_defaults_from_config() {
    let env = TestEnv::new();
    env.json(&["config", "set", "default-year", "2031"]);
    let result = env.json(&["actuals", "--revenue", "1"]);
    assert_eq!(result["year"], 2031);
}

#[test]
fn test_extract_command() {
    let env = TestEnv::new();
    let result = env.json(&["extract", "年商1億円"]);
    assert_eq!(result["title"], "年商1億円");
    assert_eq!(result["type"], "revenue");
    assert_eq!(result["revenueTarget"], 100_000_000);

    let result = env.json(&["extract", "頑張る"]);
    assert_eq!(result["type"], "custom");
    assert!(result.get("revenueTarget").is_none());
    assert!(result.get("profitTarget").is_none());

    env.mandala()
        .args(["-H", "extract", "Operating profit 250"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-> profit (revenue -, profit 250)"));
}
