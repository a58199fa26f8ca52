//! In-memory key-value backend.

use super::backend::{BackendType, KeyValueBackend};
use crate::Result;
use std::collections::BTreeMap;

/// Volatile backend holding values in a map.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    values: BTreeMap<String, String>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend pre-filled with raw values.
    pub fn with_values<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.values.keys().cloned().collect())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let mut backend = MemoryBackend::new();
        assert_eq!(backend.get("a").unwrap(), None);

        backend.set("a", "1").unwrap();
        backend.set("a", "2").unwrap();
        assert_eq!(backend.get("a").unwrap(), Some("2".to_string()));

        backend.remove("a").unwrap();
        backend.remove("a").unwrap();
        assert_eq!(backend.get("a").unwrap(), None);
    }

    #[test]
    fn test_keys_sorted() {
        let backend = MemoryBackend::with_values([("b", "2"), ("a", "1")]);
        assert_eq!(backend.keys().unwrap(), vec!["a", "b"]);
    }
}
