//! Mandala - A hierarchical goal chart engine.
//!
//! This library provides the core functionality for the `mandala` CLI tool:
//! a three-level goal tree with cascading achievement, monetary target
//! extraction from goal titles, and synchronization with yearly actuals.

pub mod action_log;
pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod events;
pub mod extract;
pub mod models;
pub mod storage;
pub mod sync;

/// Test utilities for isolated test environments.
#[cfg(test)]
pub(crate) mod test_utils {
    use std::sync::Arc;

    use crate::controller::GoalChart;
    use crate::events::RecordingListener;
    use crate::storage::{GoalStore, MemoryBackend};

    /// Open a chart over a fresh in-memory store with a recording listener.
    pub fn memory_chart() -> (GoalChart<MemoryBackend>, Arc<RecordingListener>) {
        chart_over(MemoryBackend::new())
    }

    /// Open a chart over an existing in-memory store.
    pub fn chart_over(
        backend: MemoryBackend,
    ) -> (GoalChart<MemoryBackend>, Arc<RecordingListener>) {
        let mut chart = GoalChart::open(GoalStore::new(backend)).unwrap();
        let recorder = Arc::new(RecordingListener::new());
        chart.subscribe(recorder.clone());
        (chart, recorder)
    }
}

/// Library-level error type for Mandala operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Mandala operations.
pub type Result<T> = std::result::Result<T, Error>;
