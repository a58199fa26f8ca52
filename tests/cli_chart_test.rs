//! Integration tests for titles, toggling and achievement propagation.

mod common;

use common::TestEnv;
use predicates::prelude::*;

const MIDDLE: &str = "major-1-middle-1";

fn minor(n: usize) -> String {
    format!("{}-minor-{}", MIDDLE, n)
}

#[test]
fn test_title_center_is_wrapped() {
    let env = TestEnv::new();
    let result = env.title("center", "Become the best team in town");
    assert_eq!(result["target"], "center");
    assert!(result.get("level").is_none());
    // 22 characters kept, split every 8
    assert_eq!(result["title"], "Become t\nhe best \nteam i");

    let summary = env.json(&[]);
    assert_eq!(summary["center_goal"], "Become t\nhe best \nteam i");
}

#[test]
fn test_title_on_middle_updates_sheet_centers() {
    let env = TestEnv::new();
    env.title(MIDDLE, "Sales");

    env.json(&["open", MIDDLE]);
    let view = env.json(&["show"]);
    assert_eq!(view["view"], "minor");
    assert_eq!(view["sheet"]["centerTitle"], "Sales");
}

#[test]
fn test_title_rejects_unknown_target() {
    let env = TestEnv::new();
    env.mandala()
        .args(["title", "major-9", "Nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("major-9"));
}

#[test]
fn test_toggle_untitled_leaf_is_noop() {
    let env = TestEnv::new();
    let result = env.json(&["toggle", &minor(1)]);
    assert_eq!(result["toggled"], false);
    assert!(result["reason"].is_string());
    assert_eq!(result["events"].as_array().unwrap().len(), 0);

    let summary = env.json(&[]);
    assert_eq!(summary["checked_leaves"], 0);
}

#[test]
fn test_toggle_cascades_achievement() {
    let env = TestEnv::new();
    env.title(&minor(1), "Call");

    let result = env.json(&["toggle", &minor(1)]);
    assert_eq!(result["toggled"], true);
    assert_eq!(result["checked"], true);
    assert_eq!(result["middle_achievement"], 10);
    assert_eq!(result["major_achievement"], 1);

    let events = result["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["type"], "goal-achieved");
    assert_eq!(events[0]["level"], "minor");
    assert_eq!(events[0]["goalTitle"], "Call");

    // Unchecking restores zero and announces nothing
    let result = env.json(&["toggle", &minor(1)]);
    assert_eq!(result["checked"], false);
    assert_eq!(result["middle_achievement"], 0);
    assert_eq!(result["major_achievement"], 0);
    assert_eq!(result["events"].as_array().unwrap().len(), 0);
}

#[test]
fn test_full_middle_reaches_hundred() {
    let env = TestEnv::new();
    for n in 1..=10 {
        env.title(&minor(n), &format!("Step {}", n));
    }
    for n in 1..=9 {
        env.json(&["toggle", &minor(n)]);
    }

    let last = env.json(&["toggle", &minor(10)]);
    assert_eq!(last["middle_achievement"], 100);
    assert_eq!(last["major_achievement"], 13);

    let levels: Vec<&str> = last["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["level"].as_str().unwrap())
        .collect();
    assert_eq!(levels, vec!["minor", "middle"]);

    let progress = env.json(&["progress", MIDDLE]);
    assert_eq!(progress["level"], "middle");
    assert_eq!(progress["filledRings"], 10);
    assert_eq!(progress["complete"], true);

    let progress = env.json(&["progress", "major-1"]);
    assert_eq!(progress["level"], "major");
    assert_eq!(progress["achievement"], 13);
    assert_eq!(progress["ratios"][0], 1.0);
    assert_eq!(progress["ratios"][1], 0.0);
}

#[test]
fn test_toggle_requires_minor_id() {
    let env = TestEnv::new();
    env.mandala()
        .args(["toggle", MIDDLE])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a minor goal"));
}

#[test]
fn test_events_are_journaled() {
    let env = TestEnv::new();
    env.title(&minor(3), "Visit");
    env.json(&["toggle", &minor(3)]);

    let journal =
        std::fs::read_to_string(env.storage_dir().join(mandala::events::EVENTS_FILE)).unwrap();
    let lines: Vec<serde_json::Value> = journal
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert!(lines.iter().any(|e| e["type"] == "goal-achieved"));
    assert!(lines.iter().all(|e| e["timestamp"].is_string()));
}

#[test]
fn test_human_toggle_output() {
    let env = TestEnv::new();
    env.title(&minor(2), "Write");
    env.mandala()
        .args(["-H", "toggle", &minor(2)])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Checked {}", minor(2))))
        .stdout(predicate::str::contains("middle 10%, major 1%"))
        .stdout(predicate::str::contains("Achieved minor goal: Write"));
}
