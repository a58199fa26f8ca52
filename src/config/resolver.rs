//! Precedence resolution for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Session config.kdl (`<data-dir>/config.kdl`)
//! 3. System config.kdl (`~/.config/mandala/config.kdl`)
//! 4. Built-in defaults

use crate::Result;
use crate::config::{MandalaConfig, OutputFormat};
use chrono::Datelike;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Config file name in both locations.
pub const CONFIG_FILE: &str = "config.kdl";

/// Environment variable overriding the diagnostic log filter.
pub const LOG_ENV: &str = "MANDALA_LOG";

/// Default tracing filter.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from session-level config
    Session,
    /// Value from system-level config
    System,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::Session => write!(f, "session"),
            ValueSource::System => write!(f, "system"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ValueSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, Serialize)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Locations of the config files.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// `~/.config/mandala/config.kdl`, when a config directory is known
    pub system: Option<PathBuf>,
    /// `<data-dir>/config.kdl`
    pub session: Option<PathBuf>,
}

impl ConfigPaths {
    /// Standard locations for a user storage directory.
    pub fn for_storage_dir(storage_dir: &Path) -> Self {
        Self {
            system: system_config_path(),
            session: Some(storage_dir.join(CONFIG_FILE)),
        }
    }
}

/// Path of the system config file.
pub fn system_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mandala").join(CONFIG_FILE))
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolvedConfig {
    /// Output format preference
    pub output_format: Resolved<OutputFormat>,
    /// Year for actuals when none is given
    pub default_year: Resolved<i32>,
    /// Tracing filter directive
    pub log_level: Resolved<String>,
    /// Whether the action log is written
    pub action_log: Resolved<bool>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
            default_year: Resolved::new(chrono::Local::now().year(), ValueSource::Default),
            log_level: Resolved::new(DEFAULT_LOG_LEVEL.to_string(), ValueSource::Default),
            action_log: Resolved::new(true, ValueSource::Default),
        }
    }
}

impl ResolvedConfig {
    /// Get the output format value.
    pub fn output_format(&self) -> OutputFormat {
        self.output_format.value
    }

    /// Get the default year value.
    pub fn default_year(&self) -> i32 {
        self.default_year.value
    }

    /// Get the log filter value.
    pub fn log_level(&self) -> &str {
        &self.log_level.value
    }

    /// Whether the action log is enabled.
    pub fn action_log(&self) -> bool {
        self.action_log.value
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Output format override from CLI flag
    pub output_format: Option<OutputFormat>,
    /// Log filter override from the environment
    pub log_level: Option<String>,
}

impl ConfigOverrides {
    /// Create empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set output format override.
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    /// Set log filter override.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Read `MANDALA_LOG` into the log filter override.
    pub fn with_log_env(self) -> Self {
        match std::env::var(LOG_ENV) {
            Ok(level) if !level.trim().is_empty() => self.with_log_level(level),
            _ => self,
        }
    }
}

/// Resolve configuration with full precedence chain.
pub fn resolve_config(paths: &ConfigPaths, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let system_config = match paths.system {
        Some(ref path) => MandalaConfig::read_file(path)?,
        None => MandalaConfig::new(),
    };
    let session_config = match paths.session {
        Some(ref path) => MandalaConfig::read_file(path)?,
        None => MandalaConfig::new(),
    };
    Ok(resolve_from(&system_config, &session_config, overrides))
}

/// Resolve already-loaded configs.
pub fn resolve_from(
    system_config: &MandalaConfig,
    session_config: &MandalaConfig,
    overrides: &ConfigOverrides,
) -> ResolvedConfig {
    let mut result = ResolvedConfig::default();

    if let Some(format) = overrides.output_format {
        result.output_format = Resolved::new(format, ValueSource::CliFlag);
    } else if let Some(format) = session_config.output_format {
        result.output_format = Resolved::new(format, ValueSource::Session);
    } else if let Some(format) = system_config.output_format {
        result.output_format = Resolved::new(format, ValueSource::System);
    }

    if let Some(year) = session_config.default_year {
        result.default_year = Resolved::new(year, ValueSource::Session);
    } else if let Some(year) = system_config.default_year {
        result.default_year = Resolved::new(year, ValueSource::System);
    }

    if let Some(ref level) = overrides.log_level {
        result.log_level = Resolved::new(level.clone(), ValueSource::EnvVar(LOG_ENV.to_string()));
    } else if let Some(ref level) = session_config.log_level {
        result.log_level = Resolved::new(level.clone(), ValueSource::Session);
    } else if let Some(ref level) = system_config.log_level {
        result.log_level = Resolved::new(level.clone(), ValueSource::System);
    }

    if let Some(enabled) = session_config.action_log {
        result.action_log = Resolved::new(enabled, ValueSource::Session);
    } else if let Some(enabled) = system_config.action_log {
        result.action_log = Resolved::new(enabled, ValueSource::System);
    }

    result
}
