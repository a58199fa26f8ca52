//! Command implementations for the Mandala CLI.
//!
//! Each command opens the user's chart from its storage directory, runs one
//! controller operation and returns a result implementing [`Output`].
//! Events published during the command are journaled to `events.jsonl` and
//! included in the result.

use crate::config::{
    CONFIG_KEYS, ConfigOverrides, ConfigPaths, MandalaConfig, ResolvedConfig, resolve_config,
};
use crate::controller::{
    ChartView, GoalChart, MajorProgress, MiddleProgress, RenderedView, TitleCommit, TitleTarget,
    ViewLevel,
};
use crate::events::{GoalEvent, JsonlEventSink, RecordingListener};
use crate::extract::{TargetExtraction, extract_target};
use crate::models::title::plain_title;
use crate::models::{
    CellLocation, GoalCell, GoalLevel, GoalStatus, MAJOR_COUNT, MIDDLE_COUNT, MINOR_COUNT,
    YearlyTarget,
};
use crate::storage::{GoalStore, KeyValueBackend, SqliteBackend};
use crate::sync::YearlyActuals;
use crate::{Error, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn to_json_string<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
}

/// A chart opened for one command, recording the events it publishes.
struct Session {
    chart: GoalChart<SqliteBackend>,
    recorder: Arc<RecordingListener>,
}

impl Session {
    fn open(storage_dir: &Path) -> Result<Self> {
        let store = GoalStore::new(SqliteBackend::open(storage_dir)?);
        let mut chart = GoalChart::open(store)?;
        let recorder = Arc::new(RecordingListener::new());
        chart.subscribe(Arc::new(JsonlEventSink::in_dir(storage_dir)));
        chart.subscribe(recorder.clone());
        Ok(Self { chart, recorder })
    }

    fn events(&self) -> Vec<GoalEvent> {
        self.recorder.take()
    }
}

fn display_title(title: &str) -> String {
    let plain = plain_title(title);
    if plain.is_empty() {
        "(empty)".to_string()
    } else {
        plain
    }
}

fn format_events(lines: &mut Vec<String>, events: &[GoalEvent]) {
    for event in events {
        match event {
            GoalEvent::GoalAchieved { level, goal_title } => {
                lines.push(format!("  * Achieved {} goal: {}", level, goal_title));
            }
            GoalEvent::MandalaUpdated { year, .. } => {
                lines.push(format!("  * Chart updated from {} actuals", year));
            }
            GoalEvent::YearlyTargetsUpdated { yearly_targets } => {
                lines.push(format!(
                    "  * Yearly targets updated ({})",
                    yearly_targets.len()
                ));
            }
        }
    }
}

fn format_cell(cell: &GoalCell) -> String {
    let mark = match cell.is_checked {
        Some(true) => "[x] ",
        Some(false) => "[ ] ",
        None => "",
    };
    format!(
        "{:<24} {}{} ({}%)",
        cell.id,
        mark,
        display_title(&cell.title),
        cell.achievement
    )
}

fn format_money(value: Option<i64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

// === Summary ===

/// Build metadata baked in at compile time.
#[derive(Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub commit: &'static str,
    pub built_at: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            commit: env!("MANDALA_GIT_COMMIT"),
            built_at: env!("MANDALA_BUILD_TIMESTAMP"),
        }
    }
}

#[derive(Serialize)]
pub struct MajorSummary {
    pub id: String,
    pub title: String,
    pub achievement: u8,
    pub status: GoalStatus,
}

#[derive(Serialize)]
pub struct SummaryResult {
    pub center_goal: String,
    pub majors: Vec<MajorSummary>,
    pub titled_goals: usize,
    pub checked_leaves: usize,
    pub total_leaves: usize,
    pub achieved_majors: usize,
    pub view: ViewLevel,
    pub storage: String,
    pub build: BuildInfo,
}

impl Output for SummaryResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!("Center goal: {}", display_title(&self.center_goal)));
        lines.push(String::new());
        for major in &self.majors {
            lines.push(format!(
                "  {:<8} {:>3}%  {:<12} {}",
                major.id,
                major.achievement,
                major.status.as_str(),
                display_title(&major.title)
            ));
        }
        lines.push(String::new());
        lines.push(format!(
            "{} goals titled, {}/{} minor goals checked, {}/{} major goals achieved",
            self.titled_goals,
            self.checked_leaves,
            self.total_leaves,
            self.achieved_majors,
            MAJOR_COUNT
        ));
        lines.push(format!("View: {}", self.view));
        lines.push(format!("Storage: {}", self.storage));
        lines.push(format!(
            "mandala {} ({} built {})",
            self.build.version, self.build.commit, self.build.built_at
        ));
        lines.join("\n")
    }
}

/// Overview of the whole chart.
pub fn summary(storage_dir: &Path) -> Result<SummaryResult> {
    let session = Session::open(storage_dir)?;
    let tree = session.chart.tree();

    let majors = tree
        .major_cells
        .iter()
        .map(|cell| MajorSummary {
            id: cell.id.clone(),
            title: cell.title.clone(),
            achievement: cell.achievement,
            status: cell.status,
        })
        .collect::<Vec<_>>();

    let titled_goals = tree.major_cells.iter().filter(|c| c.has_title()).count()
        + tree
            .middle_charts
            .values()
            .chain(tree.minor_charts.values())
            .flat_map(|sheet| sheet.cells.iter())
            .filter(|c| c.has_title())
            .count();

    Ok(SummaryResult {
        center_goal: tree.center_goal.clone(),
        achieved_majors: majors
            .iter()
            .filter(|m| m.status == GoalStatus::Achieved)
            .count(),
        majors,
        titled_goals,
        checked_leaves: tree.checked_leaves(),
        total_leaves: MAJOR_COUNT * MIDDLE_COUNT * MINOR_COUNT,
        view: session.chart.view().level,
        storage: session.chart.store().backend().location(),
        build: BuildInfo::current(),
    })
}

// === Navigation ===

#[derive(Serialize)]
pub struct ViewResult {
    pub state: ChartView,
    #[serde(flatten)]
    pub rendered: RenderedView,
}

impl Output for ViewResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        match &self.rendered {
            RenderedView::Major { center_goal, cells } => {
                lines.push(format!("Major chart: {}", display_title(center_goal)));
                for cell in cells {
                    lines.push(format!("  {}", format_cell(cell)));
                }
            }
            RenderedView::Middle {
                major_id,
                sheet,
                ratios,
            } => {
                lines.push(format!(
                    "Middle chart {}: {}",
                    major_id,
                    display_title(&sheet.center_title)
                ));
                for (cell, ratio) in sheet.cells.iter().zip(ratios) {
                    lines.push(format!(
                        "  {}  rings {}/{}",
                        format_cell(cell),
                        (ratio * MINOR_COUNT as f64).round() as usize,
                        MINOR_COUNT
                    ));
                }
            }
            RenderedView::Minor {
                middle_id,
                sheet,
                filled_rings,
                ..
            } => {
                lines.push(format!(
                    "Minor chart {}: {} ({}/{} checked)",
                    middle_id,
                    display_title(&sheet.center_title),
                    filled_rings,
                    MINOR_COUNT
                ));
                for cell in &sheet.cells {
                    lines.push(format!("  {}", format_cell(cell)));
                }
            }
            RenderedView::NotFound { level, id } => {
                lines.push(format!("Not found: {} chart '{}' does not exist", level, id));
                lines.push("Use `mandala back --to-major` to return to the major chart.".to_string());
            }
        }
        lines.join("\n")
    }
}

/// Render the current view.
pub fn show(storage_dir: &Path) -> Result<ViewResult> {
    let session = Session::open(storage_dir)?;
    Ok(view_of(&session.chart))
}

fn view_of<B: KeyValueBackend>(chart: &GoalChart<B>) -> ViewResult {
    ViewResult {
        state: chart.view().clone(),
        rendered: chart.render(),
    }
}

#[derive(Serialize)]
pub struct NavigationResult {
    pub moved: bool,
    #[serde(flatten)]
    pub view: ViewResult,
}

impl Output for NavigationResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.moved {
            self.view.to_human()
        } else {
            format!("Already at the {} chart\n{}", self.view.state.level, self.view.to_human())
        }
    }
}

/// Open the chart under a major or middle cell from any view.
pub fn open(storage_dir: &Path, id: &str) -> Result<NavigationResult> {
    let parent_major = match CellLocation::parse(id) {
        Some(CellLocation::Major { .. }) => None,
        Some(CellLocation::Middle { major, .. }) => Some(crate::models::major_id(major + 1)),
        Some(CellLocation::Minor { .. }) => {
            return Err(Error::InvalidInput(format!(
                "{} is a minor goal and has no chart of its own",
                id
            )));
        }
        None => return Err(Error::InvalidId(id.to_string())),
    };

    let mut session = Session::open(storage_dir)?;
    let chart = &mut session.chart;
    let before = chart.view().clone();

    match chart.view().level {
        ViewLevel::Major => {}
        ViewLevel::Middle => {
            chart.back()?;
        }
        ViewLevel::Minor => {
            chart.back_to_major()?;
        }
    }
    match parent_major {
        None => {
            chart.select_major(id)?;
        }
        Some(major) => {
            chart.select_major(&major)?;
            chart.select_middle(id)?;
        }
    }

    Ok(NavigationResult {
        moved: chart.view() != &before,
        view: view_of(chart),
    })
}

/// Go back one level, or straight to the major chart.
pub fn back(storage_dir: &Path, to_major: bool) -> Result<NavigationResult> {
    let mut session = Session::open(storage_dir)?;
    let chart = &mut session.chart;
    let moved = match (chart.view().level, to_major) {
        (ViewLevel::Major, _) => false,
        (ViewLevel::Middle, _) => chart.back()?,
        (ViewLevel::Minor, true) => chart.back_to_major()?,
        (ViewLevel::Minor, false) => chart.back_to_middle()?,
    };
    Ok(NavigationResult {
        moved,
        view: view_of(chart),
    })
}

// === Editing ===

#[derive(Serialize)]
pub struct TitleResult {
    #[serde(flatten)]
    pub commit: TitleCommit,
    pub events: Vec<GoalEvent>,
}

impl Output for TitleResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Set {} to \"{}\"",
            self.commit.target,
            display_title(&self.commit.title)
        )];
        if self.commit.title.contains('\n') {
            for line in self.commit.title.lines() {
                lines.push(format!("  | {}", line));
            }
        }
        format_events(&mut lines, &self.events);
        lines.join("\n")
    }
}

/// Commit a title as if typed outside of composition.
pub fn title(storage_dir: &Path, target: &str, text: &str) -> Result<TitleResult> {
    let target = TitleTarget::parse(target)?;
    let mut session = Session::open(storage_dir)?;
    let commit = session
        .chart
        .input_title(&target, text)?
        .ok_or_else(|| Error::Other("title input was buffered".to_string()))?;
    Ok(TitleResult {
        commit,
        events: session.events(),
    })
}

#[derive(Serialize)]
pub struct ToggleResult {
    pub id: String,
    pub toggled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub middle_achievement: u8,
    pub major_achievement: u8,
    pub events: Vec<GoalEvent>,
}

impl Output for ToggleResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        match (self.toggled, self.checked) {
            (true, Some(true)) => lines.push(format!("Checked {}", self.id)),
            (true, _) => lines.push(format!("Unchecked {}", self.id)),
            (false, _) => lines.push(format!(
                "Nothing to toggle at {}: {}",
                self.id,
                self.reason.as_deref().unwrap_or("unchanged")
            )),
        }
        lines.push(format!(
            "  middle {}%, major {}%",
            self.middle_achievement, self.major_achievement
        ));
        format_events(&mut lines, &self.events);
        lines.join("\n")
    }
}

/// Flip a minor leaf.
pub fn toggle(storage_dir: &Path, id: &str) -> Result<ToggleResult> {
    let Some(CellLocation::Minor { major, middle, .. }) = CellLocation::parse(id) else {
        return Err(Error::InvalidId(format!("{} is not a minor goal ID", id)));
    };
    let major_id = crate::models::major_id(major + 1);
    let middle_id = crate::models::middle_id(&major_id, middle + 1);

    let mut session = Session::open(storage_dir)?;
    let outcome = session.chart.toggle_minor(id)?;
    let tree = session.chart.tree();
    let achievement = |cell_id: &str| tree.cell(cell_id).map_or(0, |c| c.achievement);

    Ok(ToggleResult {
        id: id.to_string(),
        toggled: outcome.is_some(),
        checked: outcome.as_ref().map(|o| o.checked),
        reason: outcome
            .is_none()
            .then(|| "minor goal has no title".to_string()),
        middle_achievement: achievement(&middle_id),
        major_achievement: achievement(&major_id),
        events: session.events(),
    })
}

// === Progress ===

#[derive(Serialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum ProgressResult {
    Major(MajorProgress),
    Middle(MiddleProgress),
}

impl Output for ProgressResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        match self {
            ProgressResult::Major(p) => {
                let mut lines = vec![format!(
                    "{} {} ({}%)",
                    p.id,
                    display_title(&p.title),
                    p.achievement
                )];
                for (i, ratio) in p.ratios.iter().enumerate() {
                    lines.push(format!("  middle-{}: {:>3.0}%", i + 1, ratio * 100.0));
                }
                lines.join("\n")
            }
            ProgressResult::Middle(p) => {
                let rings: String = (0..MINOR_COUNT)
                    .map(|i| if i < p.filled_rings { '●' } else { '○' })
                    .collect();
                format!(
                    "{} {} ({}%)\n  {} {}/{}{}",
                    p.id,
                    display_title(&p.title),
                    p.achievement,
                    rings,
                    p.filled_rings,
                    MINOR_COUNT,
                    if p.complete { " complete" } else { "" }
                )
            }
        }
    }
}

/// Ring progress for a major or middle cell.
pub fn progress(storage_dir: &Path, id: &str) -> Result<ProgressResult> {
    let session = Session::open(storage_dir)?;
    let chart = &session.chart;
    match CellLocation::parse(id).map(|loc| loc.level()) {
        Some(GoalLevel::Major) => chart
            .major_progress(id)
            .map(ProgressResult::Major)
            .ok_or_else(|| Error::NotFound(id.to_string())),
        Some(GoalLevel::Middle) => chart
            .middle_progress(id)
            .map(ProgressResult::Middle)
            .ok_or_else(|| Error::NotFound(id.to_string())),
        Some(GoalLevel::Minor) => Err(Error::InvalidInput(format!(
            "{} is a minor goal; progress is shown for major and middle goals",
            id
        ))),
        None => Err(Error::InvalidId(id.to_string())),
    }
}

// === Targets ===

#[derive(Serialize)]
pub struct TargetsResult {
    pub yearly_targets: Vec<YearlyTarget>,
    pub events: Vec<GoalEvent>,
}

impl Output for TargetsResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.yearly_targets.is_empty() {
            return "No yearly targets. Title a major goal to create one.".to_string();
        }
        let mut lines = vec![format!("{} yearly target(s):", self.yearly_targets.len())];
        for target in &self.yearly_targets {
            lines.push(format!(
                "  {:<8} {:<8} revenue {:>12}  profit {:>12}  {}",
                target.goal_id,
                target.kind.as_str(),
                format_money(target.revenue_target),
                format_money(target.profit_target),
                target.goal_title
            ));
        }
        format_events(&mut lines, &self.events);
        lines.join("\n")
    }
}

/// Rebuild the target list from the major titles.
pub fn targets_sync(storage_dir: &Path) -> Result<TargetsResult> {
    let mut session = Session::open(storage_dir)?;
    let yearly_targets = session.chart.sync_goals_to_targets()?;
    Ok(TargetsResult {
        yearly_targets,
        events: session.events(),
    })
}

/// The last synchronized target list.
pub fn targets_list(storage_dir: &Path) -> Result<TargetsResult> {
    let session = Session::open(storage_dir)?;
    Ok(TargetsResult {
        yearly_targets: session.chart.yearly_targets()?,
        events: Vec::new(),
    })
}

// === Actuals ===

#[derive(Serialize)]
pub struct ActualsResult {
    pub year: i32,
    pub actuals: YearlyActuals,
    pub changed: bool,
    pub checked: Vec<String>,
    pub events: Vec<GoalEvent>,
}

impl Output for ActualsResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        if self.changed {
            lines.push(format!(
                "{} actuals checked {} goal(s):",
                self.year,
                self.checked.len()
            ));
            for id in &self.checked {
                lines.push(format!("  {}", id));
            }
        } else {
            lines.push(format!("{} actuals met no new goals", self.year));
        }
        if self.actuals.gross_profit_actual.is_some() {
            lines.push("  (gross profit is not compared against goals)".to_string());
        }
        format_events(&mut lines, &self.events);
        lines.join("\n")
    }
}

/// Apply yearly actuals to the chart.
pub fn actuals(storage_dir: &Path, year: i32, actuals: YearlyActuals) -> Result<ActualsResult> {
    let mut session = Session::open(storage_dir)?;
    let outcomes = session.chart.apply_yearly_actuals(year, &actuals)?;
    Ok(ActualsResult {
        year,
        actuals,
        changed: !outcomes.is_empty(),
        checked: outcomes.into_iter().map(|o| o.cell_id).collect(),
        events: session.events(),
    })
}

// === Extraction ===

#[derive(Serialize)]
pub struct ExtractResult {
    pub title: String,
    #[serde(flatten)]
    pub extraction: TargetExtraction,
}

impl Output for ExtractResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!(
            "\"{}\" -> {} (revenue {}, profit {})",
            self.title,
            self.extraction.kind,
            format_money(self.extraction.revenue_target),
            format_money(self.extraction.profit_target)
        )
    }
}

/// Run the extraction heuristic on a title.
pub fn extract(title: &str) -> ExtractResult {
    ExtractResult {
        title: title.to_string(),
        extraction: extract_target(title),
    }
}

// === Reset ===

#[derive(Serialize)]
pub struct ResetResult {
    pub removed_keys: usize,
}

impl Output for ResetResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.removed_keys == 0 {
            "Nothing to reset".to_string()
        } else {
            format!("Reset chart ({} stored keys removed)", self.removed_keys)
        }
    }
}

/// Delete every stored chart key for the user.
pub fn reset(storage_dir: &Path) -> Result<ResetResult> {
    let mut session = Session::open(storage_dir)?;
    Ok(ResetResult {
        removed_keys: session.chart.reset()?,
    })
}

// === Config ===

#[derive(Serialize)]
pub struct ConfigShowResult {
    #[serde(flatten)]
    pub resolved: ResolvedConfig,
    pub files: ConfigFiles,
}

#[derive(Serialize)]
pub struct ConfigFiles {
    pub system: Option<String>,
    pub session: Option<String>,
}

impl ConfigFiles {
    fn from_paths(paths: &ConfigPaths) -> Self {
        Self {
            system: paths.system.as_ref().map(|p| p.display().to_string()),
            session: paths.session.as_ref().map(|p| p.display().to_string()),
        }
    }
}

impl Output for ConfigShowResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let r = &self.resolved;
        let mut lines = vec![
            format!(
                "output-format = {} ({})",
                r.output_format.value, r.output_format.source
            ),
            format!(
                "default-year  = {} ({})",
                r.default_year.value, r.default_year.source
            ),
            format!("log-level     = {} ({})", r.log_level.value, r.log_level.source),
            format!(
                "action-log    = {} ({})",
                if r.action_log.value { "on" } else { "off" },
                r.action_log.source
            ),
        ];
        if let Some(ref system) = self.files.system {
            lines.push(format!("system config:  {}", system));
        }
        if let Some(ref session) = self.files.session {
            lines.push(format!("session config: {}", session));
        }
        lines.join("\n")
    }
}

/// Show resolved configuration.
pub fn config_show(paths: &ConfigPaths, overrides: &ConfigOverrides) -> Result<ConfigShowResult> {
    Ok(ConfigShowResult {
        resolved: resolve_config(paths, overrides)?,
        files: ConfigFiles::from_paths(paths),
    })
}

#[derive(Serialize)]
pub struct ConfigValue {
    pub key: String,
    pub value: serde_json::Value,
    pub source: String,
}

impl Output for ConfigValue {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let value = match &self.value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Bool(true) => "on".to_string(),
            serde_json::Value::Bool(false) => "off".to_string(),
            other => other.to_string(),
        };
        format!("{} = {} ({})", self.key, value, self.source)
    }
}

/// Get one resolved configuration value.
pub fn config_get(
    paths: &ConfigPaths,
    overrides: &ConfigOverrides,
    key: &str,
) -> Result<ConfigValue> {
    let r = resolve_config(paths, overrides)?;
    let (value, source) = match key {
        "output-format" => (
            serde_json::json!(r.output_format.value),
            &r.output_format.source,
        ),
        "default-year" => (
            serde_json::json!(r.default_year.value),
            &r.default_year.source,
        ),
        "log-level" => (serde_json::json!(r.log_level.value), &r.log_level.source),
        "action-log" => (serde_json::json!(r.action_log.value), &r.action_log.source),
        _ => {
            return Err(Error::InvalidInput(format!(
                "Unknown config key '{}'. Valid keys: {}",
                key,
                CONFIG_KEYS.join(", ")
            )));
        }
    };
    Ok(ConfigValue {
        key: key.to_string(),
        value,
        source: source.to_string(),
    })
}

#[derive(Serialize)]
pub struct ConfigSetResult {
    pub key: String,
    pub value: String,
    pub path: String,
}

impl Output for ConfigSetResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Set {} = {} in {}", self.key, self.value, self.path)
    }
}

/// Validate and write one key to the session config file.
pub fn config_set(session_path: &Path, key: &str, value: &str) -> Result<ConfigSetResult> {
    let mut config = MandalaConfig::read_file(session_path)?;
    config.set(key, value)?;
    config.write_file(session_path)?;
    Ok(ConfigSetResult {
        key: key.to_string(),
        value: value.to_string(),
        path: session_path.display().to_string(),
    })
}
