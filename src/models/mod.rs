//! Data models for the goal chart.
//!
//! This module defines the core data structures:
//! - `GoalCell` - One node at any level of the chart
//! - `ChartSheet` - A grid of cells surrounding a parent cell (middle or minor chart)
//! - `GoalTree` - The complete three-level chart plus its center goal
//! - `YearlyTarget` - A monetary target derived from a major goal title

pub mod achievement;
pub mod title;
pub mod tree;

pub use tree::{CellLocation, GoalTree, ToggleOutcome};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of major cells around the center goal.
pub const MAJOR_COUNT: usize = 8;

/// Number of middle cells under each major cell.
pub const MIDDLE_COUNT: usize = 8;

/// Number of minor (leaf) cells under each middle cell.
pub const MINOR_COUNT: usize = 10;

/// Hierarchy level of a goal cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalLevel {
    Major,
    Middle,
    Minor,
}

impl GoalLevel {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalLevel::Major => "major",
            GoalLevel::Middle => "middle",
            GoalLevel::Minor => "minor",
        }
    }
}

impl fmt::Display for GoalLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Completion bucket derived from a cell's achievement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    NotStarted,
    InProgress,
    Achieved,
}

impl GoalStatus {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::NotStarted => "not_started",
            GoalStatus::InProgress => "in_progress",
            GoalStatus::Achieved => "achieved",
        }
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single goal cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalCell {
    /// Positional identifier (e.g., "major-1-middle-3-minor-10")
    pub id: String,

    /// Formatted title (at most 3 lines of 8 characters)
    #[serde(default)]
    pub title: String,

    /// Completion percentage (0-100)
    #[serde(default)]
    pub achievement: u8,

    /// Derived status
    #[serde(default)]
    pub status: GoalStatus,

    /// Checkbox state, only present on minor cells
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_checked: Option<bool>,
}

impl GoalCell {
    /// Create an empty major or middle cell.
    pub fn new(id: String) -> Self {
        Self {
            id,
            title: String::new(),
            achievement: 0,
            status: GoalStatus::NotStarted,
            is_checked: None,
        }
    }

    /// Create an empty, unchecked minor cell.
    pub fn new_leaf(id: String) -> Self {
        Self {
            is_checked: Some(false),
            ..Self::new(id)
        }
    }

    /// Whether this leaf is checked. Non-leaf cells are never checked.
    pub fn checked(&self) -> bool {
        self.is_checked.unwrap_or(false)
    }

    /// Whether the title has any visible content.
    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }

    /// Set the achievement and the status derived from it.
    pub fn set_achievement(&mut self, value: u8) {
        self.achievement = value.min(100);
        self.status = achievement::status_from_achievement(self.achievement);
    }
}

/// A chart of cells surrounding a parent cell.
///
/// Middle charts hold 8 cells around a major cell; minor charts hold 10 leaves
/// under a middle cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSheet {
    /// ID of the parent cell shown at the center
    pub center_id: String,

    /// Title of the parent cell, mirrored for display
    #[serde(default)]
    pub center_title: String,

    /// Child cells in positional order
    #[serde(default)]
    pub cells: Vec<GoalCell>,
}

/// Build the ID of the major cell at a 1-based position.
pub fn major_id(position: usize) -> String {
    format!("major-{}", position)
}

/// Build the ID of a middle cell at a 1-based position under a major cell.
pub fn middle_id(major_id: &str, position: usize) -> String {
    format!("{}-middle-{}", major_id, position)
}

/// Build the ID of a minor cell at a 1-based position under a middle cell.
pub fn minor_id(middle_id: &str, position: usize) -> String {
    format!("{}-minor-{}", middle_id, position)
}

/// Kind of monetary target inferred from a goal title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Revenue,
    Profit,
    #[default]
    Custom,
}

impl TargetKind {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Revenue => "revenue",
            TargetKind::Profit => "profit",
            TargetKind::Custom => "custom",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A yearly monetary target derived from a major goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyTarget {
    /// Source major cell ID
    pub goal_id: String,

    /// Source major cell title
    pub goal_title: String,

    /// Revenue target in currency units
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_target: Option<i64>,

    /// Profit target in currency units
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit_target: Option<i64>,

    /// How the title was classified
    #[serde(rename = "type")]
    pub kind: TargetKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_ids_are_positional() {
        let major = major_id(3);
        let middle = middle_id(&major, 8);
        let minor = minor_id(&middle, 10);
        assert_eq!(major, "major-3");
        assert_eq!(middle, "major-3-middle-8");
        assert_eq!(minor, "major-3-middle-8-minor-10");
    }

    #[test]
    fn test_leaf_serialization_uses_camel_case() {
        let mut cell = GoalCell::new_leaf("major-1-middle-1-minor-1".to_string());
        cell.title = "Call\nclients".to_string();
        cell.is_checked = Some(true);
        cell.set_achievement(100);

        let json = serde_json::to_string(&cell).unwrap();
        assert!(json.contains("\"isChecked\":true"));
        assert!(json.contains("\"status\":\"achieved\""));
    }

    #[test]
    fn test_non_leaf_omits_is_checked() {
        let cell = GoalCell::new("major-1".to_string());
        let json = serde_json::to_string(&cell).unwrap();
        assert!(!json.contains("isChecked"));
        assert!(!cell.checked());
    }

    #[test]
    fn test_yearly_target_serialization() {
        let target = YearlyTarget {
            goal_id: "major-1".to_string(),
            goal_title: "年商1億円".to_string(),
            revenue_target: Some(100_000_000),
            profit_target: None,
            kind: TargetKind::Revenue,
        };
        let json = serde_json::to_string(&target).unwrap();
        assert!(json.contains("\"goalId\":\"major-1\""));
        assert!(json.contains("\"revenueTarget\":100000000"));
        assert!(json.contains("\"type\":\"revenue\""));
        assert!(!json.contains("profitTarget"));
    }

    #[test]
    fn test_cell_deserializes_with_missing_fields() {
        let cell: GoalCell = serde_json::from_str(r#"{"id":"major-2"}"#).unwrap();
        assert_eq!(cell.title, "");
        assert_eq!(cell.achievement, 0);
        assert_eq!(cell.status, GoalStatus::NotStarted);
    }
}
