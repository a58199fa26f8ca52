//! Action logging for Mandala commands.
//!
//! Every CLI invocation is appended as one JSON line to `action.log` in the
//! data root.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Log file name inside the data root.
pub const ACTION_LOG_FILE: &str = "action.log";

/// Argument names whose values are never written.
const SENSITIVE_KEYS: &[&str] = &["password", "token", "secret", "api_key", "apikey"];

/// Longest string value kept verbatim.
const MAX_STRING_CHARS: usize = 100;

/// Represents a single action log entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionLog {
    /// ISO 8601 timestamp when the action occurred
    pub timestamp: DateTime<Utc>,

    /// User namespace the command ran against
    pub user: String,

    /// Command name (e.g., "toggle", "targets sync")
    pub command: String,

    /// Command arguments as JSON
    pub args: serde_json::Value,

    /// Whether the command succeeded
    pub success: bool,

    /// Error message if the command failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Command execution duration in milliseconds
    pub duration_ms: u64,
}

impl ActionLog {
    /// Build an entry stamped now, with sanitized arguments.
    pub fn new(
        user: &str,
        command: &str,
        args: &serde_json::Value,
        success: bool,
        error: Option<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            user: user.to_string(),
            command: command.to_string(),
            args: sanitize_args(args),
            success,
            error,
            duration_ms,
        }
    }
}

/// Path of the log inside a data root.
pub fn log_path(data_root: &Path) -> PathBuf {
    data_root.join(ACTION_LOG_FILE)
}

/// Append an entry to the log in `data_root`.
///
/// This function never fails; problems are reported through `tracing` so a
/// broken log never breaks a command.
pub fn log_action(data_root: &Path, entry: &ActionLog) {
    let path = log_path(data_root);
    if let Err(e) = write_log_entry(&path, entry) {
        tracing::warn!(path = %path.display(), error = %e, "failed to write action log");
    }
}

/// Write a log entry to the log file.
fn write_log_entry(path: &Path, entry: &ActionLog) -> crate::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string(entry)?;

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", json)?;

    Ok(())
}

/// Sanitize arguments to remove sensitive data.
pub fn sanitize_args(args: &serde_json::Value) -> serde_json::Value {
    match args {
        serde_json::Value::Object(map) => {
            let mut sanitized = serde_json::Map::new();
            for (key, value) in map {
                let key_lower = key.to_lowercase();
                if SENSITIVE_KEYS.iter().any(|s| key_lower.contains(s)) {
                    sanitized.insert(
                        key.clone(),
                        serde_json::Value::String("[REDACTED]".to_string()),
                    );
                } else {
                    sanitized.insert(key.clone(), sanitize_args(value));
                }
            }
            serde_json::Value::Object(sanitized)
        }
        serde_json::Value::Array(arr) => {
            if arr.len() > 10 {
                serde_json::Value::String(format!("[Array with {} items]", arr.len()))
            } else {
                serde_json::Value::Array(arr.iter().map(sanitize_args).collect())
            }
        }
        serde_json::Value::String(s) => {
            // Paths are reduced to their basename
            let sanitized = if s.contains('/') || s.contains('\\') {
                s.rsplit(['/', '\\']).next().unwrap_or(s).to_string()
            } else {
                s.clone()
            };

            let chars = sanitized.chars().count();
            if chars > MAX_STRING_CHARS {
                let head: String = sanitized.chars().take(MAX_STRING_CHARS - 3).collect();
                serde_json::Value::String(format!("{}... ({} chars)", head, chars))
            } else {
                serde_json::Value::String(sanitized)
            }
        }
        _ => args.clone(),
    }
}
