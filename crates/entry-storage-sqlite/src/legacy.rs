//! Legacy key-value store
//!
//! The store that predates the encrypted database: flat string keys,
//! JSON string values, no encryption. The data service only reads it
//! (migration, conflict detection); writes exist so tests and tooling
//! can seed legacy fixtures.

use entry_core::{Error, LegacyStore, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File-backed legacy store: the whole map lives in one JSON file,
/// loaded on open and rewritten on every mutation.
pub struct FileLegacyStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileLegacyStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)
                .map_err(|e| Error::Storage(format!("Failed to read legacy store: {}", e)))?;
            serde_json::from_str(&raw)?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, raw)
            .map_err(|e| Error::Storage(format!("Failed to write legacy store: {}", e)))
    }
}

impl LegacyStore for FileLegacyStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        entries.remove(key);
        self.persist(&entries)
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.lock().keys().cloned().collect())
    }
}

/// In-memory legacy store for tests
#[derive(Default)]
pub struct MemoryLegacyStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryLegacyStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl LegacyStore for MemoryLegacyStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.lock().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("legacy.json");

        let store = FileLegacyStore::open(&path).unwrap();
        store.set_item("@passport", r#"{"passportNumber":"E1"}"#).unwrap();
        drop(store);

        let reopened = FileLegacyStore::open(&path).unwrap();
        assert_eq!(
            reopened.get_item("@passport").unwrap().as_deref(),
            Some(r#"{"passportNumber":"E1"}"#)
        );
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = FileLegacyStore::open(dir.path().join("absent.json")).unwrap();
        assert!(store.get_item("@passport").unwrap().is_none());
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn test_remove_item() {
        let store = MemoryLegacyStore::new();
        store.set_item("k", "v").unwrap();
        store.remove_item("k").unwrap();
        assert!(store.get_item("k").unwrap().is_none());
    }
}
