//! Storage layer for goal chart data.
//!
//! This module handles persistence of the goal tree, the yearly target list
//! and the chart navigation state.
//!
//! ## Keys
//!
//! All data lives in a flat key-value store:
//! - `center_goal` - plain string
//! - `major_cells` - JSON array of 8 cells
//! - `middle_charts` - JSON map of major cell ID to chart sheet
//! - `minor_charts` - JSON map of middle cell ID to chart sheet
//! - `yearly_targets` - JSON array, replaced wholesale by each sync
//! - `chart_view` - JSON navigation state
//!
//! Stored achievements are a cache. Every load recomputes them from the
//! leaves and corrects disagreements.

pub mod backend;
pub mod memory;
pub mod sqlite;

pub use backend::{BackendType, KeyValueBackend};
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use crate::models::{ChartSheet, GoalCell, GoalTree, YearlyTarget};
use crate::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Root goal text (plain string).
pub const CENTER_GOAL_KEY: &str = "center_goal";
/// Major cells.
pub const MAJOR_CELLS_KEY: &str = "major_cells";
/// Middle charts by major cell ID.
pub const MIDDLE_CHARTS_KEY: &str = "middle_charts";
/// Minor charts by middle cell ID.
pub const MINOR_CHARTS_KEY: &str = "minor_charts";
/// Synchronizer output.
pub const YEARLY_TARGETS_KEY: &str = "yearly_targets";
/// Chart navigation state.
pub const CHART_VIEW_KEY: &str = "chart_view";

/// Every key owned by the goal chart.
pub const ALL_KEYS: &[&str] = &[
    CENTER_GOAL_KEY,
    MAJOR_CELLS_KEY,
    MIDDLE_CHARTS_KEY,
    MINOR_CHARTS_KEY,
    YEARLY_TARGETS_KEY,
    CHART_VIEW_KEY,
];

/// Environment variable overriding the data root.
pub const DATA_DIR_ENV: &str = "MANDALA_DATA_DIR";

/// Typed access to goal chart data over a key-value backend.
pub struct GoalStore<B> {
    backend: B,
}

impl<B: KeyValueBackend> GoalStore<B> {
    /// Wrap a backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Borrow the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutably borrow the underlying backend.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Check whether any part of the tree has been persisted.
    pub fn has_tree(&self) -> Result<bool> {
        for key in [CENTER_GOAL_KEY, MAJOR_CELLS_KEY, MIDDLE_CHARTS_KEY, MINOR_CHARTS_KEY] {
            if self.backend.get(key)?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Load the goal tree.
    ///
    /// Missing keys yield empty parts, so a first load returns a blank tree.
    /// A key holding malformed JSON is treated as missing. Derived values are
    /// recomputed and corrected before returning.
    pub fn load_tree(&self) -> Result<GoalTree> {
        let mut tree = GoalTree {
            center_goal: self.backend.get(CENTER_GOAL_KEY)?.unwrap_or_default(),
            major_cells: self
                .read_json::<Vec<GoalCell>>(MAJOR_CELLS_KEY)?
                .unwrap_or_default(),
            middle_charts: self
                .read_json::<BTreeMap<String, ChartSheet>>(MIDDLE_CHARTS_KEY)?
                .unwrap_or_default(),
            minor_charts: self
                .read_json::<BTreeMap<String, ChartSheet>>(MINOR_CHARTS_KEY)?
                .unwrap_or_default(),
        };

        let persisted = self.has_tree()?;
        let corrections = tree.normalize();
        if persisted && corrections > 0 {
            tracing::warn!(
                corrections,
                location = %self.backend.location(),
                "stored goal tree disagreed with derived values; corrected"
            );
        }

        Ok(tree)
    }

    /// Persist the whole tree.
    pub fn save_tree(&mut self, tree: &GoalTree) -> Result<()> {
        self.backend.set(CENTER_GOAL_KEY, &tree.center_goal)?;
        self.write_json(MAJOR_CELLS_KEY, &tree.major_cells)?;
        self.write_json(MIDDLE_CHARTS_KEY, &tree.middle_charts)?;
        self.write_json(MINOR_CHARTS_KEY, &tree.minor_charts)?;
        tracing::debug!(location = %self.backend.location(), "goal tree saved");
        Ok(())
    }

    /// Load the last synchronized target list.
    pub fn load_yearly_targets(&self) -> Result<Vec<YearlyTarget>> {
        Ok(self.read_json(YEARLY_TARGETS_KEY)?.unwrap_or_default())
    }

    /// Replace the target list wholesale.
    pub fn save_yearly_targets(&mut self, targets: &[YearlyTarget]) -> Result<()> {
        self.write_json(YEARLY_TARGETS_KEY, &targets)
    }

    /// Remove every goal chart key. Returns how many keys were present.
    pub fn reset(&mut self) -> Result<usize> {
        let mut removed = 0;
        for key in ALL_KEYS {
            if self.backend.get(key)?.is_some() {
                self.backend.remove(key)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Read and decode a JSON value.
    ///
    /// Returns `Ok(None)` when the key is missing or its content does not
    /// parse; the latter is logged and otherwise ignored.
    pub fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.backend.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring malformed stored value");
                Ok(None)
            }
        }
    }

    /// Encode and store a JSON value.
    pub fn write_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.backend.set(key, &raw)
    }
}

/// Get the data root shared by all users.
///
/// Uses `MANDALA_DATA_DIR` when set, otherwise `<data dir>/mandala`.
pub fn get_data_root() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let data_dir = dirs::data_dir()
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?;
    Ok(data_dir.join("mandala"))
}

/// Get the storage directory for a user.
///
/// Uses a hash of the user name to create a unique directory under the data root.
pub fn get_storage_dir(user: &str) -> Result<PathBuf> {
    Ok(get_storage_dir_in(&get_data_root()?, user))
}

/// Get the storage directory for a user under an explicit root.
pub fn get_storage_dir_in(root: &Path, user: &str) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(user.as_bytes());
    let hash = hasher.finalize();
    let hash_hex = format!("{:x}", hash);
    root.join(&hash_hex[..12])
}

/// Validate a user name used to select a data namespace.
pub fn validate_user(user: &str) -> Result<()> {
    if user.trim().is_empty() {
        return Err(Error::InvalidInput("user must not be empty".to_string()));
    }
    if user.chars().any(char::is_control) {
        return Err(Error::InvalidInput(format!(
            "user contains control characters: {:?}",
            user
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GoalStatus;
    use tempfile::TempDir;

    fn memory_store() -> GoalStore<MemoryBackend> {
        GoalStore::new(MemoryBackend::new())
    }

    #[test]
    fn test_first_load_is_blank_tree() {
        let store = memory_store();
        assert!(!store.has_tree().unwrap());
        let tree = store.load_tree().unwrap();
        assert_eq!(tree, GoalTree::new());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let mut store = memory_store();
        let mut tree = GoalTree::new();
        tree.set_center_goal("Best shop".to_string());
        tree.set_title("major-1", "Grow".to_string());
        tree.set_title("major-1-middle-1-minor-1", "Call".to_string());
        tree.toggle_minor("major-1-middle-1-minor-1").unwrap();

        store.save_tree(&tree).unwrap();
        assert!(store.has_tree().unwrap());
        assert_eq!(
            store.backend().get(CENTER_GOAL_KEY).unwrap(),
            Some("Best shop".to_string())
        );
        assert_eq!(store.load_tree().unwrap(), tree);
    }

    #[test]
    fn test_malformed_key_falls_back_independently() {
        let mut store = memory_store();
        let mut tree = GoalTree::new();
        tree.set_title("major-3", "Keep".to_string());
        store.save_tree(&tree).unwrap();

        store
            .backend_mut()
            .set(MINOR_CHARTS_KEY, "{not json")
            .unwrap();

        let loaded = store.load_tree().unwrap();
        assert_eq!(loaded.cell("major-3").unwrap().title, "Keep");
        assert_eq!(loaded.minor_charts.len(), 64);
    }

    #[test]
    fn test_load_recomputes_cached_achievements() {
        let mut store = memory_store();
        let mut tree = GoalTree::new();
        tree.set_title("major-1-middle-1-minor-1", "Call".to_string());
        tree.toggle_minor("major-1-middle-1-minor-1").unwrap();
        store.save_tree(&tree).unwrap();

        let mut majors = tree.major_cells.clone();
        majors[0].achievement = 90;
        majors[0].status = GoalStatus::InProgress;
        store.write_json(MAJOR_CELLS_KEY, &majors).unwrap();

        let loaded = store.load_tree().unwrap();
        assert_eq!(loaded.cell("major-1").unwrap().achievement, 1);
        assert_eq!(loaded, tree);
    }

    #[test]
    fn test_yearly_targets_replaced_wholesale() {
        let mut store = memory_store();
        let first = vec![
            YearlyTarget {
                goal_id: "major-1".to_string(),
                goal_title: "a".to_string(),
                revenue_target: Some(1),
                profit_target: None,
                kind: crate::models::TargetKind::Custom,
            };
            2
        ];
        store.save_yearly_targets(&first).unwrap();
        store.save_yearly_targets(&first[..1]).unwrap();
        assert_eq!(store.load_yearly_targets().unwrap().len(), 1);
    }

    #[test]
    fn test_reset_removes_all_keys() {
        let mut store = memory_store();
        store.save_tree(&GoalTree::new()).unwrap();
        store.save_yearly_targets(&[]).unwrap();

        assert_eq!(store.reset().unwrap(), 5);
        assert!(!store.has_tree().unwrap());
        assert!(store.backend().keys().unwrap().is_empty());
    }

    #[test]
    fn test_sqlite_store_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let mut tree = GoalTree::new();
        tree.set_title("major-8", "Last".to_string());
        {
            let mut store = GoalStore::new(SqliteBackend::open(temp_dir.path()).unwrap());
            store.save_tree(&tree).unwrap();
        }
        let store = GoalStore::new(SqliteBackend::open(temp_dir.path()).unwrap());
        assert_eq!(store.load_tree().unwrap(), tree);
    }

    #[test]
    fn test_storage_dir_is_per_user() {
        let root = Path::new("/data");
        let alice = get_storage_dir_in(root, "alice");
        let bob = get_storage_dir_in(root, "bob");
        assert_ne!(alice, bob);
        assert_eq!(alice, get_storage_dir_in(root, "alice"));
        assert_eq!(alice.file_name().unwrap().len(), 12);
    }

    #[test]
    fn test_validate_user() {
        assert!(validate_user("owner@example.com").is_ok());
        assert!(validate_user("").is_err());
        assert!(validate_user("  ").is_err());
        assert!(validate_user("a\u{7}b").is_err());
    }
}
