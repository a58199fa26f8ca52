//! Key-value backend trait and backend types.
//!
//! The goal chart persists through a flat string store with last-write-wins
//! semantics per key, the same contract a browser's local storage offers:
//! - `SqliteBackend` - Single-table SQLite database (default)
//! - `MemoryBackend` - In-process map for tests and embedding

use crate::Result;

/// Trait for backends that persist string values by key.
pub trait KeyValueBackend: Send {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;

    /// List every stored key in ascending order.
    fn keys(&self) -> Result<Vec<String>>;

    /// Get the storage location description (for display purposes).
    fn location(&self) -> String;

    /// Get the backend type.
    fn backend_type(&self) -> BackendType;
}

impl<B: KeyValueBackend + ?Sized> KeyValueBackend for Box<B> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }

    fn keys(&self) -> Result<Vec<String>> {
        (**self).keys()
    }

    fn location(&self) -> String {
        (**self).location()
    }

    fn backend_type(&self) -> BackendType {
        (**self).backend_type()
    }
}

/// Available backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// SQLite file in the user's data directory
    Sqlite,
    /// Volatile in-memory map
    Memory,
}

impl BackendType {
    /// Parse a backend type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sqlite" | "file" | "default" => Some(Self::Sqlite),
            "memory" | "mem" => Some(Self::Memory),
            _ => None,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Memory => "memory",
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
