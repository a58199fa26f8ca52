//! Smoke tests for the Mandala CLI.
//!
//! These tests verify basic CLI functionality:
//! - `mandala --version` outputs version info
//! - `mandala --help` outputs help text
//! - `mandala` (no args) outputs a JSON summary

mod common;

use assert_cmd::Command;
use common::TestEnv;
use predicates::prelude::*;

/// Get a Command for the mandala binary.
fn mandala() -> Command {
    Command::new(env!("CARGO_BIN_EXE_mandala"))
}

#[test]
fn test_version_flag() {
    mandala()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mandala"))
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_help_flag() {
    mandala()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("toggle"));
}

#[test]
fn test_no_args_outputs_json_summary() {
    let env = TestEnv::new();
    let summary = env.json(&[]);
    assert_eq!(summary["majors"].as_array().unwrap().len(), 8);
    assert_eq!(summary["total_leaves"], 640);
    assert_eq!(summary["view"], "major");
    assert_eq!(summary["build"]["version"], "0.1.0");
}

#[test]
fn test_human_readable_flag() {
    let env = TestEnv::new();
    env.mandala()
        .arg("-H")
        .assert()
        .success()
        .stdout(predicate::str::contains("Center goal: (empty)"))
        .stdout(predicate::str::contains("major-8"));
}

#[test]
fn test_invalid_command() {
    mandala()
        .arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_errors_are_json_by_default() {
    let env = TestEnv::new();
    env.mandala()
        .args(["toggle", "major-9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("{\"error\":"));

    env.mandala()
        .args(["-H", "toggle", "major-9"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Error: "));
}
