//! KDL schema for config.kdl.
//!
//! This module provides:
//! - The Rust struct representing the KDL schema
//! - Serialization/deserialization to/from KDL format
//! - Validation and single-key updates
//! - File reading and writing

use crate::{Error, Result};
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Keys accepted in config.kdl.
pub const CONFIG_KEYS: &[&str] = &["output-format", "default-year", "log-level", "action-log"];

/// Years accepted for `default-year`.
pub const YEAR_RANGE: std::ops::RangeInclusive<i64> = 1900..=9999;

/// User preferences stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// output-format "human"  // or "json"
/// default-year 2025
/// log-level "mandala=debug"
/// action-log "off"       // or "on"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MandalaConfig {
    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,

    /// Year used by `actuals` when `--year` is omitted
    pub default_year: Option<i32>,

    /// Tracing filter directive for diagnostics
    pub log_level: Option<String>,

    /// Whether CLI invocations are appended to action.log
    pub action_log: Option<bool>,
}

impl MandalaConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(year) = self.default_year {
            if !YEAR_RANGE.contains(&i64::from(year)) {
                return Err(format!("default-year must be 1900-9999, got {}", year));
            }
        }
        if let Some(ref level) = self.log_level {
            if level.trim().is_empty() {
                return Err("log-level must not be empty".to_string());
            }
        }
        Ok(())
    }

    /// Parse config from a KDL document.
    ///
    /// Unknown nodes and values of the wrong type are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        if let Some(s) = first_string(doc, "output-format") {
            config.output_format = OutputFormat::parse(s);
        }

        if let Some(node) = doc.get("default-year") {
            if let Some(entry) = node.entries().first() {
                if let Some(year) = entry.value().as_integer().and_then(|i| i64::try_from(i).ok()) {
                    if YEAR_RANGE.contains(&year) {
                        config.default_year = i32::try_from(year).ok();
                    }
                }
            }
        }

        if let Some(s) = first_string(doc, "log-level") {
            config.log_level = Some(s.to_string());
        }

        if let Some(s) = first_string(doc, "action-log") {
            config.action_log = parse_switch(s);
        }

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(format) = self.output_format {
            push_string(&mut doc, "output-format", format.as_str());
        }

        if let Some(year) = self.default_year {
            let mut node = KdlNode::new("default-year");
            node.push(KdlEntry::new(KdlValue::Integer(year as i128)));
            doc.nodes_mut().push(node);
        }

        if let Some(ref level) = self.log_level {
            push_string(&mut doc, "log-level", level);
        }

        if let Some(enabled) = self.action_log {
            push_string(&mut doc, "action-log", if enabled { "on" } else { "off" });
        }

        doc
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &MandalaConfig) {
        if other.output_format.is_some() {
            self.output_format = other.output_format;
        }
        if other.default_year.is_some() {
            self.default_year = other.default_year;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level.clone();
        }
        if other.action_log.is_some() {
            self.action_log = other.action_log;
        }
    }

    /// Set one key from its textual form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "output-format" => {
                self.output_format = Some(OutputFormat::parse(value).ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "output-format must be 'json' or 'human', got '{}'",
                        value
                    ))
                })?);
            }
            "default-year" => {
                let year: i32 = value.trim().parse().map_err(|_| {
                    Error::InvalidInput(format!("default-year must be a year, got '{}'", value))
                })?;
                self.default_year = Some(year);
            }
            "log-level" => {
                self.log_level = Some(value.to_string());
            }
            "action-log" => {
                self.action_log = Some(parse_switch(value).ok_or_else(|| {
                    Error::InvalidInput(format!("action-log must be 'on' or 'off', got '{}'", value))
                })?);
            }
            _ => {
                return Err(Error::InvalidInput(format!(
                    "Unknown config key '{}'. Valid keys: {}",
                    key,
                    CONFIG_KEYS.join(", ")
                )));
            }
        }
        self.validate().map_err(Error::InvalidInput)
    }

    /// Load config from a file. A missing file yields an empty config.
    pub fn read_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| Error::Other(format!("Failed to read {}: {}", path.display(), e)))?;

        let doc: KdlDocument = content.parse().map_err(|e| {
            Error::Other(format!("Failed to parse KDL in {}: {}", path.display(), e))
        })?;

        Ok(Self::from_kdl(&doc))
    }

    /// Write config to a file, creating parent directories.
    pub fn write_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_kdl().to_string())?;
        Ok(())
    }
}

fn first_string<'a>(doc: &'a KdlDocument, name: &str) -> Option<&'a str> {
    doc.get(name)?.entries().first()?.value().as_string()
}

fn push_string(doc: &mut KdlDocument, name: &str, value: &str) {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(KdlValue::String(value.to_string())));
    doc.nodes_mut().push(node);
}

fn parse_switch(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}
