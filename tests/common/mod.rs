//! Common test utilities for mandala integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's data or config directories.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// User name every `TestEnv` command runs as.
pub const TEST_USER: &str = "tester";

/// A test environment with isolated data storage.
///
/// Each `TestEnv` creates two temporary directories:
/// - `data_dir`: Holds chart data (via `MANDALA_DATA_DIR` env var)
/// - `config_dir`: Stands in for `~/.config` (via `XDG_CONFIG_HOME`)
///
/// The `mandala()` method returns a `Command` with these set per-invocation,
/// making tests parallel-safe.
pub struct TestEnv {
    pub data_dir: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with isolated directories.
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
        }
    }

    /// Get a Command for the mandala binary with isolated directories.
    pub fn mandala(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_mandala"));
        cmd.current_dir(self.data_dir.path());
        cmd.env("MANDALA_DATA_DIR", self.data_dir.path());
        cmd.env("XDG_CONFIG_HOME", self.config_dir.path());
        cmd.env("MANDALA_USER", TEST_USER);
        cmd.env_remove("MANDALA_LOG");
        cmd.env_remove("MANDALA_LOG_FORMAT");
        cmd
    }

    /// Run a command that must succeed and parse its JSON output.
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.mandala().args(args).assert().success();
        let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
        serde_json::from_str(stdout.trim()).unwrap_or_else(|e| {
            panic!("invalid JSON from {:?}: {}\n{}", args, e, stdout);
        })
    }

    /// Set a title, asserting success.
    pub fn title(&self, target: &str, text: &str) -> serde_json::Value {
        self.json(&["title", target, text])
    }

    /// Get the path to the data root.
    pub fn data_path(&self) -> &Path {
        self.data_dir.path()
    }

    /// Storage directory of the test user.
    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir_for(TEST_USER)
    }

    /// Storage directory of any user.
    pub fn storage_dir_for(&self, user: &str) -> PathBuf {
        mandala::storage::get_storage_dir_in(self.data_path(), user)
    }

    /// Path standing in for `~/.config/mandala/config.kdl`.
    pub fn system_config_path(&self) -> PathBuf {
        self.config_dir.path().join("mandala").join("config.kdl")
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
