//! The three-level goal tree and its cascading updates.
//!
//! Structure:
//! - 8 major cells around the center goal
//! - a middle chart of 8 cells for every major cell
//! - a minor chart of 10 leaves for every middle cell
//!
//! Middle and major achievements are derived values. Every mutation that can
//! change them recomputes the chain leaf -> middle -> major before returning.

use super::achievement::{major_achievement, middle_achievement};
use super::title::plain_title;
use super::{
    ChartSheet, GoalCell, GoalLevel, MAJOR_COUNT, MIDDLE_COUNT, MINOR_COUNT, major_id, middle_id,
    minor_id,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Position of a cell in the tree, using 0-based indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellLocation {
    Major { index: usize },
    Middle { major: usize, index: usize },
    Minor { major: usize, middle: usize, index: usize },
}

impl CellLocation {
    /// Parse a positional cell ID.
    ///
    /// Returns `None` for malformed IDs or positions outside the fixed fan-out.
    pub fn parse(id: &str) -> Option<Self> {
        let parts: Vec<&str> = id.split('-').collect();
        let position = |s: &str, max: usize| -> Option<usize> {
            let n: usize = s.parse().ok()?;
            (1..=max).contains(&n).then(|| n - 1)
        };

        match parts.as_slice() {
            ["major", m] => Some(Self::Major {
                index: position(*m, MAJOR_COUNT)?,
            }),
            ["major", m, "middle", d] => Some(Self::Middle {
                major: position(*m, MAJOR_COUNT)?,
                index: position(*d, MIDDLE_COUNT)?,
            }),
            ["major", m, "middle", d, "minor", n] => Some(Self::Minor {
                major: position(*m, MAJOR_COUNT)?,
                middle: position(*d, MIDDLE_COUNT)?,
                index: position(*n, MINOR_COUNT)?,
            }),
            _ => None,
        }
    }

    /// Level of the located cell.
    pub fn level(&self) -> GoalLevel {
        match self {
            Self::Major { .. } => GoalLevel::Major,
            Self::Middle { .. } => GoalLevel::Middle,
            Self::Minor { .. } => GoalLevel::Minor,
        }
    }
}

/// A cell whose achievement just reached 100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievedGoal {
    pub level: GoalLevel,
    pub goal_title: String,
}

/// Result of flipping a minor leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// The toggled leaf
    pub cell_id: String,
    /// New checkbox state
    pub checked: bool,
    /// Cells that crossed into 100, in cascade order (minor, middle, major)
    pub achieved: Vec<AchievedGoal>,
}

/// The complete goal chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalTree {
    /// Root goal text
    #[serde(default)]
    pub center_goal: String,

    /// The 8 major cells
    #[serde(default)]
    pub major_cells: Vec<GoalCell>,

    /// Middle charts keyed by major cell ID
    #[serde(default)]
    pub middle_charts: BTreeMap<String, ChartSheet>,

    /// Minor charts keyed by middle cell ID
    #[serde(default)]
    pub minor_charts: BTreeMap<String, ChartSheet>,
}

impl Default for GoalTree {
    fn default() -> Self {
        Self::new()
    }
}

impl GoalTree {
    /// Create an empty tree with every cell present.
    pub fn new() -> Self {
        let mut tree = Self {
            center_goal: String::new(),
            major_cells: Vec::new(),
            middle_charts: BTreeMap::new(),
            minor_charts: BTreeMap::new(),
        };
        tree.normalize();
        tree
    }

    /// Repair structure and recompute every derived field.
    ///
    /// Missing cells and charts are created empty, cell IDs are reset to their
    /// positional form, leaves without a title are unchecked, and achievements
    /// are recomputed bottom-up. Returns the number of corrections made.
    pub fn normalize(&mut self) -> usize {
        let mut corrections = 0;

        corrections += fit_cells(&mut self.major_cells, MAJOR_COUNT, |i| {
            GoalCell::new(major_id(i + 1))
        });

        for m in 0..MAJOR_COUNT {
            let mid = major_id(m + 1);
            let major_title = self.major_cells[m].title.clone();
            let sheet = self
                .middle_charts
                .entry(mid.clone())
                .or_insert_with(|| empty_sheet(&mid));
            corrections += fit_sheet(sheet, &mid, &major_title, MIDDLE_COUNT, |i| {
                GoalCell::new(middle_id(&mid, i + 1))
            });

            for d in 0..MIDDLE_COUNT {
                let did = middle_id(&mid, d + 1);
                let middle_title = sheet.cells[d].title.clone();
                let minor_sheet = self
                    .minor_charts
                    .entry(did.clone())
                    .or_insert_with(|| empty_sheet(&did));
                corrections += fit_sheet(minor_sheet, &did, &middle_title, MINOR_COUNT, |i| {
                    GoalCell::new_leaf(minor_id(&did, i + 1))
                });

                for leaf in &mut minor_sheet.cells {
                    if leaf.is_checked.is_none() || (leaf.checked() && !leaf.has_title()) {
                        leaf.is_checked = Some(false);
                        corrections += 1;
                    }
                    let expected = if leaf.checked() { 100 } else { 0 };
                    corrections += apply_achievement(leaf, expected);
                }
            }
        }

        for m in 0..MAJOR_COUNT {
            for d in 0..MIDDLE_COUNT {
                corrections += self.recompute_middle(m, d).1;
            }
            corrections += self.recompute_major(m).1;
        }

        self.minor_charts.retain(|id, _| CellLocation::parse(id).is_some());
        self.middle_charts.retain(|id, _| CellLocation::parse(id).is_some());

        corrections
    }

    /// Look up any cell by ID.
    pub fn cell(&self, id: &str) -> Option<&GoalCell> {
        match CellLocation::parse(id)? {
            CellLocation::Major { index } => self.major_cells.get(index),
            CellLocation::Middle { major, index } => self
                .middle_charts
                .get(&major_id(major + 1))?
                .cells
                .get(index),
            CellLocation::Minor {
                major,
                middle,
                index,
            } => self
                .minor_charts
                .get(&middle_id(&major_id(major + 1), middle + 1))?
                .cells
                .get(index),
        }
    }

    fn cell_mut(&mut self, location: CellLocation) -> Option<&mut GoalCell> {
        match location {
            CellLocation::Major { index } => self.major_cells.get_mut(index),
            CellLocation::Middle { major, index } => self
                .middle_charts
                .get_mut(&major_id(major + 1))?
                .cells
                .get_mut(index),
            CellLocation::Minor {
                major,
                middle,
                index,
            } => self
                .minor_charts
                .get_mut(&middle_id(&major_id(major + 1), middle + 1))?
                .cells
                .get_mut(index),
        }
    }

    /// The middle chart under a major cell.
    pub fn middle_chart(&self, major_id: &str) -> Option<&ChartSheet> {
        self.middle_charts.get(major_id)
    }

    /// The minor chart under a middle cell.
    pub fn minor_chart(&self, middle_id: &str) -> Option<&ChartSheet> {
        self.minor_charts.get(middle_id)
    }

    /// Replace the center goal text. Returns whether it changed.
    pub fn set_center_goal(&mut self, title: String) -> bool {
        if self.center_goal == title {
            return false;
        }
        self.center_goal = title;
        true
    }

    /// Replace a cell's title, keeping child chart headers in sync.
    ///
    /// Returns the level of the edited cell, or `None` for unknown IDs.
    /// Achievements are untouched, except that a checked leaf whose title is
    /// cleared is unchecked and the cascade recomputed.
    pub fn set_title(&mut self, id: &str, title: String) -> Option<GoalLevel> {
        let location = CellLocation::parse(id)?;
        let cell = self.cell_mut(location)?;
        cell.title = title.clone();
        let uncheck = cell.checked() && !cell.has_title();
        if uncheck {
            cell.is_checked = Some(false);
            cell.set_achievement(0);
        }

        match location {
            CellLocation::Major { .. } => {
                if let Some(sheet) = self.middle_charts.get_mut(id) {
                    sheet.center_title = title;
                }
            }
            CellLocation::Middle { .. } => {
                if let Some(sheet) = self.minor_charts.get_mut(id) {
                    sheet.center_title = title;
                }
            }
            CellLocation::Minor { major, middle, .. } => {
                if uncheck {
                    self.recompute_middle(major, middle);
                    self.recompute_major(major);
                    tracing::debug!(cell = id, "leaf unchecked by title clear");
                }
            }
        }

        Some(location.level())
    }

    /// Flip a minor leaf and cascade.
    ///
    /// Returns `None` without touching anything when the ID is not a known
    /// leaf or the leaf has no title.
    pub fn toggle_minor(&mut self, id: &str) -> Option<ToggleOutcome> {
        let checked = self.cell(id)?.checked();
        self.set_leaf(id, !checked)
    }

    /// Check a minor leaf if it is not already checked, and cascade.
    pub fn check_minor(&mut self, id: &str) -> Option<ToggleOutcome> {
        if self.cell(id)?.checked() {
            return None;
        }
        self.set_leaf(id, true)
    }

    fn set_leaf(&mut self, id: &str, checked: bool) -> Option<ToggleOutcome> {
        let location = CellLocation::parse(id)?;
        let CellLocation::Minor {
            major,
            middle,
            index: _,
        } = location
        else {
            return None;
        };

        let mut achieved = Vec::new();

        let leaf = self.cell_mut(location)?;
        if !leaf.has_title() {
            return None;
        }
        let before = leaf.achievement;
        leaf.is_checked = Some(checked);
        leaf.set_achievement(if checked { 100 } else { 0 });
        if before < 100 && leaf.achievement == 100 {
            achieved.push(AchievedGoal {
                level: GoalLevel::Minor,
                goal_title: plain_title(&leaf.title),
            });
        }

        let (middle_before, _) = self.recompute_middle(major, middle);
        let middle_cell = self.cell_mut(CellLocation::Middle {
            major,
            index: middle,
        })?;
        if middle_before < 100 && middle_cell.achievement == 100 {
            achieved.push(AchievedGoal {
                level: GoalLevel::Middle,
                goal_title: plain_title(&middle_cell.title),
            });
        }

        let (major_before, _) = self.recompute_major(major);
        let major_cell = &self.major_cells[major];
        if major_before < 100 && major_cell.achievement == 100 {
            achieved.push(AchievedGoal {
                level: GoalLevel::Major,
                goal_title: plain_title(&major_cell.title),
            });
        }

        tracing::debug!(
            cell = id,
            checked,
            major = self.major_cells[major].achievement,
            "leaf toggled"
        );

        Some(ToggleOutcome {
            cell_id: id.to_string(),
            checked,
            achieved,
        })
    }

    /// Recompute a middle cell from its leaves.
    ///
    /// Returns the previous achievement and whether anything changed (0 or 1).
    fn recompute_middle(&mut self, major: usize, middle: usize) -> (u8, usize) {
        let did = middle_id(&major_id(major + 1), middle + 1);
        let value = self
            .minor_charts
            .get(&did)
            .map(|sheet| middle_achievement(&sheet.cells))
            .unwrap_or(0);

        match self.cell_mut(CellLocation::Middle {
            major,
            index: middle,
        }) {
            Some(cell) => {
                let before = cell.achievement;
                (before, apply_achievement(cell, value))
            }
            None => (0, 0),
        }
    }

    /// Recompute a major cell from its middle cells.
    fn recompute_major(&mut self, major: usize) -> (u8, usize) {
        let value = self
            .middle_charts
            .get(&major_id(major + 1))
            .map(|sheet| major_achievement(&sheet.cells))
            .unwrap_or(0);

        match self.major_cells.get_mut(major) {
            Some(cell) => {
                let before = cell.achievement;
                (before, apply_achievement(cell, value))
            }
            None => (0, 0),
        }
    }

    /// All minor leaves in chart order.
    pub fn leaves(&self) -> impl Iterator<Item = &GoalCell> {
        self.minor_charts.values().flat_map(|sheet| sheet.cells.iter())
    }

    /// Major cells that have a title.
    pub fn titled_majors(&self) -> impl Iterator<Item = &GoalCell> {
        self.major_cells.iter().filter(|cell| cell.has_title())
    }

    /// Total number of checked leaves.
    pub fn checked_leaves(&self) -> usize {
        self.leaves().filter(|leaf| leaf.checked()).count()
    }

    /// Whether the tree carries no user content at all.
    pub fn is_blank(&self) -> bool {
        self.center_goal.is_empty()
            && self.major_cells.iter().all(|c| !c.has_title())
            && self
                .middle_charts
                .values()
                .chain(self.minor_charts.values())
                .flat_map(|sheet| sheet.cells.iter())
                .all(|c| !c.has_title() && !c.checked())
    }
}

fn empty_sheet(center_id: &str) -> ChartSheet {
    ChartSheet {
        center_id: center_id.to_string(),
        center_title: String::new(),
        cells: Vec::new(),
    }
}

/// Set an achievement, returning 1 if the cell changed.
fn apply_achievement(cell: &mut GoalCell, value: u8) -> usize {
    let before = (cell.achievement, cell.status);
    cell.set_achievement(value);
    usize::from(before != (cell.achievement, cell.status))
}

/// Resize a cell list to `len` and reset IDs to their positional form.
fn fit_cells(cells: &mut Vec<GoalCell>, len: usize, make: impl Fn(usize) -> GoalCell) -> usize {
    let mut corrections = 0;
    if cells.len() > len {
        cells.truncate(len);
        corrections += 1;
    }
    for i in 0..len {
        let expected = make(i);
        match cells.get_mut(i) {
            Some(cell) => {
                if cell.id != expected.id {
                    cell.id = expected.id;
                    corrections += 1;
                }
            }
            None => {
                cells.push(expected);
                corrections += 1;
            }
        }
    }
    corrections
}

fn fit_sheet(
    sheet: &mut ChartSheet,
    center_id: &str,
    center_title: &str,
    len: usize,
    make: impl Fn(usize) -> GoalCell,
) -> usize {
    let mut corrections = 0;
    if sheet.center_id != center_id {
        sheet.center_id = center_id.to_string();
        corrections += 1;
    }
    if sheet.center_title != center_title {
        sheet.center_title = center_title.to_string();
        corrections += 1;
    }
    corrections + fit_cells(&mut sheet.cells, len, make)
}
