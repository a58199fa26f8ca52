//! Events published by the goal chart.
//!
//! The chart notifies other parts of a host application through an
//! [`EventBus`]. Listeners are called synchronously, in subscription order,
//! after the change they describe has been persisted.

use crate::models::{GoalLevel, GoalTree, YearlyTarget};
use crate::models::tree::AchievedGoal;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// File name of the event journal inside a storage directory.
pub const EVENTS_FILE: &str = "events.jsonl";

/// Notifications emitted by chart operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum GoalEvent {
    /// A cell's achievement crossed into 100
    #[serde(rename_all = "camelCase")]
    GoalAchieved { level: GoalLevel, goal_title: String },

    /// Actual results changed the chart
    #[serde(rename_all = "camelCase")]
    MandalaUpdated { year: i32, data: GoalTree },

    /// The yearly target list was rebuilt from major titles
    #[serde(rename_all = "camelCase")]
    YearlyTargetsUpdated { yearly_targets: Vec<YearlyTarget> },
}

impl GoalEvent {
    /// Get the event name used in the `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            GoalEvent::GoalAchieved { .. } => "goal-achieved",
            GoalEvent::MandalaUpdated { .. } => "mandala-updated",
            GoalEvent::YearlyTargetsUpdated { .. } => "yearly-targets-updated",
        }
    }
}

impl From<AchievedGoal> for GoalEvent {
    fn from(achieved: AchievedGoal) -> Self {
        GoalEvent::GoalAchieved {
            level: achieved.level,
            goal_title: achieved.goal_title,
        }
    }
}

/// Trait for event listeners.
pub trait EventListener: Send + Sync {
    /// Handle an event.
    fn on_event(&self, event: &GoalEvent);
}

/// Synchronous fan-out of events to subscribed listeners.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Arc<dyn EventListener>>,
}

impl EventBus {
    /// Create a bus with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.
    pub fn subscribe(&mut self, listener: Arc<dyn EventListener>) {
        self.listeners.push(listener);
    }

    /// Deliver an event to every listener.
    pub fn publish(&self, event: &GoalEvent) {
        tracing::trace!(event = event.name(), listeners = self.listeners.len(), "publishing");
        for listener in &self.listeners {
            listener.on_event(event);
        }
    }

    /// Get the number of subscribed listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

/// Listener that keeps every event in memory.
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<GoalEvent>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the events received so far.
    pub fn events(&self) -> Vec<GoalEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Remove and return the events received so far.
    pub fn take(&self) -> Vec<GoalEvent> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl EventListener for RecordingListener {
    fn on_event(&self, event: &GoalEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

/// Listener appending each event as one JSON line to a journal file.
///
/// Write failures are logged and swallowed; a broken journal never fails a
/// chart operation.
pub struct JsonlEventSink {
    path: PathBuf,
}

#[derive(Serialize)]
struct JournalEntry<'a> {
    timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(flatten)]
    event: &'a GoalEvent,
}

impl JsonlEventSink {
    /// Journal at `<dir>/events.jsonl`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(EVENTS_FILE))
    }

    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, event: &GoalEvent) -> crate::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let entry = JournalEntry {
            timestamp: chrono::Utc::now(),
            event,
        };
        let json = serde_json::to_string(&entry)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

impl EventListener for JsonlEventSink {
    fn on_event(&self, event: &GoalEvent) {
        if let Err(e) = self.append(event) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to journal event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn achieved(title: &str) -> GoalEvent {
        GoalEvent::GoalAchieved {
            level: GoalLevel::Middle,
            goal_title: title.to_string(),
        }
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(achieved("Sales")).unwrap();
        assert_eq!(json["type"], "goal-achieved");
        assert_eq!(json["level"], "middle");
        assert_eq!(json["goalTitle"], "Sales");

        let json = serde_json::to_value(GoalEvent::YearlyTargetsUpdated {
            yearly_targets: Vec::new(),
        })
        .unwrap();
        assert_eq!(json["type"], "yearly-targets-updated");
        assert!(json["yearlyTargets"].as_array().unwrap().is_empty());

        let json = serde_json::to_value(GoalEvent::MandalaUpdated {
            year: 2024,
            data: GoalTree::new(),
        })
        .unwrap();
        assert_eq!(json["type"], "mandala-updated");
        assert_eq!(json["year"], 2024);
        assert_eq!(json["data"]["majorCells"].as_array().unwrap().len(), 8);
    }

    #[test]
    fn test_bus_delivers_in_order_to_all_listeners() {
        let first = Arc::new(RecordingListener::new());
        let second = Arc::new(RecordingListener::new());
        let mut bus = EventBus::new();
        bus.subscribe(first.clone());
        bus.subscribe(second.clone());
        assert_eq!(bus.listener_count(), 2);

        bus.publish(&achieved("a"));
        bus.publish(&achieved("b"));

        assert_eq!(first.events(), vec![achieved("a"), achieved("b")]);
        assert_eq!(second.take().len(), 2);
        assert!(second.events().is_empty());
    }

    #[test]
    fn test_publish_without_listeners() {
        EventBus::new().publish(&achieved("nobody"));
    }

    #[test]
    fn test_jsonl_sink_appends_lines() {
        let temp_dir = TempDir::new().unwrap();
        let sink = JsonlEventSink::in_dir(&temp_dir.path().join("nested"));
        sink.on_event(&achieved("one"));
        sink.on_event(&achieved("two"));

        let content = fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed["type"], "goal-achieved");
        assert_eq!(parsed["goalTitle"], "two");
        assert!(parsed["timestamp"].is_string());
    }
}
