//! Configuration for Mandala.
//!
//! ## config.kdl - User preferences
//!
//! Located at:
//! - System: `~/.config/mandala/config.kdl`
//! - Session: `<data-dir>/<user-hash>/config.kdl`
//!
//! Contains:
//! - `output-format` - "json" or "human"
//! - `default-year` - Year used for actuals when none is given
//! - `log-level` - Tracing filter for diagnostics
//! - `action-log` - "on" or "off"
//!
//! ## Precedence
//!
//! CLI flag > session config > system config > defaults
//!
//! Use the [`resolver`] module for unified precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    CONFIG_FILE, ConfigOverrides, ConfigPaths, DEFAULT_LOG_LEVEL, LOG_ENV, Resolved,
    ResolvedConfig, ValueSource, resolve_config, resolve_from, system_config_path,
};
pub use schema::{CONFIG_KEYS, MandalaConfig, OutputFormat};
