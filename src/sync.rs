//! Synchronization between the goal chart and yearly financial results.
//!
//! Outbound: major goal titles become a list of yearly monetary targets.
//! Inbound: actual revenue and profit check off the leaves whose extracted
//! targets they meet.

use crate::controller::GoalChart;
use crate::events::GoalEvent;
use crate::extract::{extract_target, is_profit_like, is_revenue_like};
use crate::models::title::plain_title;
use crate::models::{GoalTree, ToggleOutcome, YearlyTarget};
use crate::storage::KeyValueBackend;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Actual results reported for a year.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyActuals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_actual: Option<i64>,

    /// Accepted for compatibility; never compared against any goal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gross_profit_actual: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_profit_actual: Option<i64>,
}

/// Derive one target per titled major cell, in position order.
pub fn build_yearly_targets(tree: &GoalTree) -> Vec<YearlyTarget> {
    tree.titled_majors()
        .map(|cell| {
            let extraction = extract_target(&cell.title);
            YearlyTarget {
                goal_id: cell.id.clone(),
                goal_title: plain_title(&cell.title),
                revenue_target: extraction.revenue_target,
                profit_target: extraction.profit_target,
                kind: extraction.kind,
            }
        })
        .collect()
}

/// IDs of unchecked leaves whose extracted target is met by the actuals.
pub fn leaves_met_by(
    tree: &GoalTree,
    actual_revenue: Option<i64>,
    actual_profit: Option<i64>,
) -> Vec<String> {
    tree.leaves()
        .filter(|leaf| leaf.has_title() && !leaf.checked())
        .filter(|leaf| {
            let extraction = extract_target(&leaf.title);
            let revenue_met = is_revenue_like(&leaf.title)
                && meets(actual_revenue, extraction.revenue_target);
            let profit_met = is_profit_like(&leaf.title)
                && meets(actual_profit, extraction.profit_target);
            revenue_met || profit_met
        })
        .map(|leaf| leaf.id.clone())
        .collect()
}

fn meets(actual: Option<i64>, target: Option<i64>) -> bool {
    matches!((actual, target), (Some(actual), Some(target)) if actual >= target)
}

impl<B: KeyValueBackend> GoalChart<B> {
    /// Rebuild the yearly target list from the major titles.
    ///
    /// The stored list is replaced wholesale and a `yearly-targets-updated`
    /// event is published.
    pub fn sync_goals_to_targets(&mut self) -> Result<Vec<YearlyTarget>> {
        let targets = build_yearly_targets(&self.tree);
        self.store.save_yearly_targets(&targets)?;
        tracing::info!(targets = targets.len(), "yearly targets synchronized");
        self.bus.publish(&GoalEvent::YearlyTargetsUpdated {
            yearly_targets: targets.clone(),
        });
        Ok(targets)
    }

    /// The target list written by the last sync.
    pub fn yearly_targets(&self) -> Result<Vec<YearlyTarget>> {
        self.store.load_yearly_targets()
    }

    /// Check off every leaf whose target the actuals meet.
    ///
    /// Returns whether anything changed. See [`GoalChart::apply_actuals`].
    pub fn apply_actuals_to_goals(
        &mut self,
        year: i32,
        actual_revenue: Option<i64>,
        actual_profit: Option<i64>,
    ) -> Result<bool> {
        Ok(!self.apply_actuals(year, actual_revenue, actual_profit)?.is_empty())
    }

    /// Check off every leaf whose target the actuals meet, returning one
    /// outcome per checked leaf.
    ///
    /// Leaves from every minor chart are considered regardless of `year`.
    /// When anything changed the tree is persisted, then the achievement
    /// events are published, then one `mandala-updated` event.
    pub fn apply_actuals(
        &mut self,
        year: i32,
        actual_revenue: Option<i64>,
        actual_profit: Option<i64>,
    ) -> Result<Vec<ToggleOutcome>> {
        tracing::debug!(
            year,
            ?actual_revenue,
            ?actual_profit,
            "applying actuals to all leaves (unscoped by year)"
        );

        let outcomes: Vec<ToggleOutcome> = leaves_met_by(&self.tree, actual_revenue, actual_profit)
            .iter()
            .filter_map(|id| self.tree.check_minor(id))
            .collect();

        if outcomes.is_empty() {
            return Ok(outcomes);
        }

        self.store.save_tree(&self.tree)?;
        tracing::info!(year, checked = outcomes.len(), "actuals checked goals");
        for outcome in &outcomes {
            self.publish_achieved(outcome);
        }
        self.bus.publish(&GoalEvent::MandalaUpdated {
            year,
            data: self.tree.clone(),
        });

        Ok(outcomes)
    }

    /// Entry point for yearly actual updates from the financial module.
    ///
    /// Returns whether anything changed. See [`GoalChart::apply_yearly_actuals`].
    pub fn on_yearly_actual_update(&mut self, year: i32, actuals: &YearlyActuals) -> Result<bool> {
        Ok(!self.apply_yearly_actuals(year, actuals)?.is_empty())
    }

    /// Apply a year's reported actuals, returning one outcome per checked leaf.
    ///
    /// Revenue and operating profit are applied; gross profit is ignored.
    pub fn apply_yearly_actuals(
        &mut self,
        year: i32,
        actuals: &YearlyActuals,
    ) -> Result<Vec<ToggleOutcome>> {
        if actuals.gross_profit_actual.is_some() {
            tracing::debug!(year, "gross profit actual ignored");
        }
        self.apply_actuals(
            year,
            actuals.revenue_actual,
            actuals.operating_profit_actual,
        )
    }
}
