//! Goal chart controller.
//!
//! `GoalChart` owns the loaded tree, its store and the event bus. It drives
//! navigation between the three chart levels, title editing with composition
//! buffering, and leaf toggling with cascade and persistence.

use crate::events::{EventBus, EventListener, GoalEvent};
use crate::models::achievement::{checked_count, ring_ratio};
use crate::models::title::{TitleInput, format_title};
use crate::models::{
    CellLocation, ChartSheet, GoalCell, GoalLevel, GoalTree, MINOR_COUNT, ToggleOutcome,
    YearlyTarget, major_id,
};
use crate::storage::{CHART_VIEW_KEY, GoalStore, KeyValueBackend};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Chart level currently displayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewLevel {
    #[default]
    Major,
    Middle,
    Minor,
}

impl ViewLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewLevel::Major => "major",
            ViewLevel::Middle => "middle",
            ViewLevel::Minor => "minor",
        }
    }
}

impl fmt::Display for ViewLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Navigation state.
///
/// `selected_major_id` is set in the middle and minor views;
/// `selected_middle_id` only in the minor view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartView {
    pub level: ViewLevel,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_major_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_middle_id: Option<String>,
}

impl ChartView {
    /// Open the middle chart of a major cell. Only valid from the major view.
    pub fn select_major(&mut self, id: &str) -> bool {
        if self.level != ViewLevel::Major
            || !matches!(CellLocation::parse(id), Some(CellLocation::Major { .. }))
        {
            return false;
        }
        self.level = ViewLevel::Middle;
        self.selected_major_id = Some(id.to_string());
        self.selected_middle_id = None;
        true
    }

    /// Open the minor chart of a middle cell in the selected major chart.
    pub fn select_middle(&mut self, id: &str) -> bool {
        if self.level != ViewLevel::Middle {
            return false;
        }
        let Some(CellLocation::Middle { major, .. }) = CellLocation::parse(id) else {
            return false;
        };
        if self.selected_major_id.as_deref() != Some(major_id(major + 1).as_str()) {
            return false;
        }
        self.level = ViewLevel::Minor;
        self.selected_middle_id = Some(id.to_string());
        true
    }

    /// Middle view back to the major view.
    pub fn back(&mut self) -> bool {
        if self.level != ViewLevel::Middle {
            return false;
        }
        *self = Self::default();
        true
    }

    /// Minor view back to the middle view of the same major cell.
    pub fn back_to_middle(&mut self) -> bool {
        if self.level != ViewLevel::Minor {
            return false;
        }
        self.level = ViewLevel::Middle;
        self.selected_middle_id = None;
        true
    }

    /// Minor view straight back to the major view.
    pub fn back_to_major(&mut self) -> bool {
        if self.level != ViewLevel::Minor {
            return false;
        }
        *self = Self::default();
        true
    }

    /// Whether the selections match the level.
    pub fn is_consistent(&self) -> bool {
        match self.level {
            ViewLevel::Major => {
                self.selected_major_id.is_none() && self.selected_middle_id.is_none()
            }
            ViewLevel::Middle => {
                self.selected_major_id.is_some() && self.selected_middle_id.is_none()
            }
            ViewLevel::Minor => {
                self.selected_major_id.is_some() && self.selected_middle_id.is_some()
            }
        }
    }
}

/// What the current view shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum RenderedView {
    #[serde(rename_all = "camelCase")]
    Major {
        center_goal: String,
        cells: Vec<GoalCell>,
    },
    #[serde(rename_all = "camelCase")]
    Middle {
        major_id: String,
        sheet: ChartSheet,
        ratios: Vec<f64>,
    },
    #[serde(rename_all = "camelCase")]
    Minor {
        major_id: String,
        middle_id: String,
        sheet: ChartSheet,
        filled_rings: usize,
    },
    /// The selection does not resolve to a chart
    #[serde(rename_all = "camelCase")]
    NotFound { level: ViewLevel, id: String },
}

/// Field being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleTarget {
    Center,
    Cell(String),
}

impl TitleTarget {
    /// Parse `center` or a positional cell ID.
    pub fn parse(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("center") {
            return Ok(Self::Center);
        }
        match CellLocation::parse(s) {
            Some(_) => Ok(Self::Cell(s.to_string())),
            None => Err(Error::InvalidId(format!(
                "{} (expected 'center' or an ID like major-1-middle-2-minor-3)",
                s
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Center => "center",
            Self::Cell(id) => id,
        }
    }

    /// Level of the edited cell; `None` for the center goal.
    pub fn level(&self) -> Option<GoalLevel> {
        match self {
            Self::Center => None,
            Self::Cell(id) => CellLocation::parse(id).map(|loc| loc.level()),
        }
    }
}

/// A committed title edit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleCommit {
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<GoalLevel>,
    pub title: String,
    /// Target list rebuilt by the edit, for major and middle titles
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yearly_targets: Option<Vec<YearlyTarget>>,
}

/// Ring progress of a major cell: one ratio per middle cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MajorProgress {
    pub id: String,
    pub title: String,
    pub achievement: u8,
    pub ratios: Vec<f64>,
}

/// Ring progress of a middle cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MiddleProgress {
    pub id: String,
    pub title: String,
    pub achievement: u8,
    pub filled_rings: usize,
    pub complete: bool,
}

/// Controller for one user's goal chart.
pub struct GoalChart<B: KeyValueBackend> {
    pub(crate) store: GoalStore<B>,
    pub(crate) bus: EventBus,
    pub(crate) tree: GoalTree,
    view: ChartView,
    input: TitleInput,
    composing: Option<TitleTarget>,
}

impl<B: KeyValueBackend> GoalChart<B> {
    /// Load the tree and navigation state from a store.
    pub fn open(store: GoalStore<B>) -> Result<Self> {
        let tree = store.load_tree()?;
        let view = match store.read_json::<ChartView>(CHART_VIEW_KEY)? {
            Some(view) if view.is_consistent() => view,
            Some(view) => {
                tracing::warn!(?view, "inconsistent navigation state; showing major view");
                ChartView::default()
            }
            None => ChartView::default(),
        };

        Ok(Self {
            store,
            bus: EventBus::new(),
            tree,
            view,
            input: TitleInput::new(),
            composing: None,
        })
    }

    /// Register an event listener.
    pub fn subscribe(&mut self, listener: Arc<dyn EventListener>) {
        self.bus.subscribe(listener);
    }

    pub fn tree(&self) -> &GoalTree {
        &self.tree
    }

    pub fn view(&self) -> &ChartView {
        &self.view
    }

    pub fn store(&self) -> &GoalStore<B> {
        &self.store
    }

    /// Re-read the tree from the store, picking up external changes.
    pub fn reload(&mut self) -> Result<()> {
        self.tree = self.store.load_tree()?;
        Ok(())
    }

    /// Clear all stored chart data and start over with a blank tree.
    pub fn reset(&mut self) -> Result<usize> {
        let removed = self.store.reset()?;
        self.tree = GoalTree::new();
        self.view = ChartView::default();
        self.input.cancel();
        self.composing = None;
        tracing::info!(removed, "goal chart reset");
        Ok(removed)
    }

    // === Navigation ===

    pub fn select_major(&mut self, id: &str) -> Result<bool> {
        self.navigate(|view| view.select_major(id))
    }

    pub fn select_middle(&mut self, id: &str) -> Result<bool> {
        self.navigate(|view| view.select_middle(id))
    }

    pub fn back(&mut self) -> Result<bool> {
        self.navigate(ChartView::back)
    }

    pub fn back_to_middle(&mut self) -> Result<bool> {
        self.navigate(ChartView::back_to_middle)
    }

    pub fn back_to_major(&mut self) -> Result<bool> {
        self.navigate(ChartView::back_to_major)
    }

    fn navigate(&mut self, transition: impl FnOnce(&mut ChartView) -> bool) -> Result<bool> {
        let from = self.view.level;
        if !transition(&mut self.view) {
            tracing::debug!(level = %from, "navigation ignored");
            return Ok(false);
        }
        self.store.write_json(CHART_VIEW_KEY, &self.view)?;
        tracing::debug!(from = %from, to = %self.view.level, "navigated");
        Ok(true)
    }

    /// Render the current view.
    pub fn render(&self) -> RenderedView {
        match self.view.level {
            ViewLevel::Major => RenderedView::Major {
                center_goal: self.tree.center_goal.clone(),
                cells: self.tree.major_cells.clone(),
            },
            ViewLevel::Middle => {
                let id = self.view.selected_major_id.clone().unwrap_or_default();
                match self.tree.middle_chart(&id) {
                    Some(sheet) => RenderedView::Middle {
                        ratios: self.middle_ratios(&id),
                        major_id: id,
                        sheet: sheet.clone(),
                    },
                    None => RenderedView::NotFound {
                        level: ViewLevel::Middle,
                        id,
                    },
                }
            }
            ViewLevel::Minor => {
                let major = self.view.selected_major_id.clone().unwrap_or_default();
                let id = self.view.selected_middle_id.clone().unwrap_or_default();
                match self.tree.minor_chart(&id) {
                    Some(sheet) if id.starts_with(&format!("{}-", major)) => RenderedView::Minor {
                        major_id: major,
                        middle_id: id,
                        filled_rings: checked_count(&sheet.cells),
                        sheet: sheet.clone(),
                    },
                    _ => RenderedView::NotFound {
                        level: ViewLevel::Minor,
                        id,
                    },
                }
            }
        }
    }

    // === Title editing ===

    /// Enter composition mode for a field.
    ///
    /// A composition in progress on another field is dropped.
    pub fn start_composition(&mut self, target: TitleTarget) {
        if let Some(previous) = self.composing.take() {
            tracing::debug!(field = previous.as_str(), "composition dropped");
        }
        self.input.cancel();
        self.input.start_composition();
        self.composing = Some(target);
    }

    /// Raw text buffered by the composition in progress.
    pub fn composing_buffer(&self) -> Option<&str> {
        self.input.buffer()
    }

    /// Feed the current value of a field.
    ///
    /// While that field is composing, the text is only buffered and `None` is
    /// returned. Otherwise the formatted title is committed.
    pub fn input_title(&mut self, target: &TitleTarget, raw: &str) -> Result<Option<TitleCommit>> {
        if self.composing.as_ref() == Some(target) {
            self.input.input(raw);
            return Ok(None);
        }
        self.commit_title(target.clone(), format_title(raw)).map(Some)
    }

    /// Finish the composition in progress with the final field value.
    ///
    /// Returns `None` when nothing was being composed.
    pub fn end_composition(&mut self, raw: &str) -> Result<Option<TitleCommit>> {
        let Some(target) = self.composing.take() else {
            return Ok(None);
        };
        let title = self.input.end_composition(raw);
        self.commit_title(target, title).map(Some)
    }

    /// Abandon the composition in progress.
    pub fn cancel_composition(&mut self) {
        self.composing = None;
        self.input.cancel();
    }

    fn commit_title(&mut self, target: TitleTarget, title: String) -> Result<TitleCommit> {
        let level = match &target {
            TitleTarget::Center => {
                self.tree.set_center_goal(title.clone());
                None
            }
            TitleTarget::Cell(id) => Some(
                self.tree
                    .set_title(id, title.clone())
                    .ok_or_else(|| Error::NotFound(format!("cell {}", id)))?,
            ),
        };
        self.store.save_tree(&self.tree)?;
        tracing::debug!(field = target.as_str(), "title committed");

        let yearly_targets = match level {
            Some(GoalLevel::Major) | Some(GoalLevel::Middle) => Some(self.sync_goals_to_targets()?),
            _ => None,
        };

        Ok(TitleCommit {
            target: target.as_str().to_string(),
            level,
            title,
            yearly_targets,
        })
    }

    // === Leaves ===

    /// Flip a minor leaf, persist, then publish achievement events.
    ///
    /// Returns `None` without side effects when the ID is not a leaf or the
    /// leaf has no title.
    pub fn toggle_minor(&mut self, id: &str) -> Result<Option<ToggleOutcome>> {
        let Some(outcome) = self.tree.toggle_minor(id) else {
            tracing::debug!(cell = id, "toggle ignored");
            return Ok(None);
        };
        self.store.save_tree(&self.tree)?;
        self.publish_achieved(&outcome);
        Ok(Some(outcome))
    }

    pub(crate) fn publish_achieved(&self, outcome: &ToggleOutcome) {
        for achieved in &outcome.achieved {
            tracing::info!(level = %achieved.level, title = %achieved.goal_title, "goal achieved");
            self.bus.publish(&GoalEvent::from(achieved.clone()));
        }
    }

    // === Progress ===

    /// Per-middle ratios for a major cell.
    pub fn major_progress(&self, id: &str) -> Option<MajorProgress> {
        let Some(CellLocation::Major { .. }) = CellLocation::parse(id) else {
            return None;
        };
        let cell = self.tree.cell(id)?;
        Some(MajorProgress {
            id: id.to_string(),
            title: cell.title.clone(),
            achievement: cell.achievement,
            ratios: self.middle_ratios(id),
        })
    }

    /// Filled rings for a middle cell.
    pub fn middle_progress(&self, id: &str) -> Option<MiddleProgress> {
        let Some(CellLocation::Middle { .. }) = CellLocation::parse(id) else {
            return None;
        };
        let cell = self.tree.cell(id)?;
        let filled_rings = self
            .tree
            .minor_chart(id)
            .map(|sheet| checked_count(&sheet.cells))
            .unwrap_or(0);
        Some(MiddleProgress {
            id: id.to_string(),
            title: cell.title.clone(),
            achievement: cell.achievement,
            filled_rings,
            complete: filled_rings == MINOR_COUNT,
        })
    }

    fn middle_ratios(&self, major_id: &str) -> Vec<f64> {
        let Some(sheet) = self.tree.middle_chart(major_id) else {
            return Vec::new();
        };
        sheet
            .cells
            .iter()
            .map(|middle| {
                self.tree
                    .minor_chart(&middle.id)
                    .map(|minor| ring_ratio(&minor.cells))
                    .unwrap_or(0.0)
            })
            .collect()
    }
}
