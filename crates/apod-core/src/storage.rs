//! Durable key-value storage
//!
//! A string-to-string store in the spirit of browser local storage. The
//! favorites store keeps its whole collection under one key.

use crate::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Anything that can hold string values under string keys
pub trait KeyValueStore: Send {
    /// `Ok(None)` when nothing was ever stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// One JSON file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Keys become file names, so anything outside `[A-Za-z0-9_-]` is replaced
    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::StorageError(format!("Failed to read {:?}: {}", path, e))),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            Error::StorageError(format!("Failed to create directory {:?}: {}", self.dir, e))
        })?;

        // Write next to the target and rename, so a crash mid-write leaves the old record intact
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)
            .map_err(|e| Error::StorageError(format!("Failed to write {:?}: {}", tmp, e)))?;
        fs::rename(&tmp, &path)
            .map_err(|e| Error::StorageError(format!("Failed to replace {:?}: {}", path, e)))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::StorageError(format!("Failed to remove {:?}: {}", path, e))),
        }
    }
}

/// In-process store. Clones share the same map, which lets tests "restart"
/// the application against the data an earlier instance wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a value, e.g. to simulate what a previous session left behind
    pub fn with_entry(self, key: &str, value: &str) -> Self {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| Error::StorageError("memory store lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::StorageError("memory store lock poisoned".into()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::StorageError("memory store lock poisoned".into()))?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("data"));

        assert_eq!(store.get("nasa-apod-favorites").unwrap(), None);

        store.set("nasa-apod-favorites", "[1,2,3]").unwrap();
        assert_eq!(
            store.get("nasa-apod-favorites").unwrap().as_deref(),
            Some("[1,2,3]")
        );
        assert!(dir.path().join("data").join("nasa-apod-favorites.json").exists());

        store.set("nasa-apod-favorites", "[]").unwrap();
        assert_eq!(store.get("nasa-apod-favorites").unwrap().as_deref(), Some("[]"));

        store.remove("nasa-apod-favorites").unwrap();
        assert_eq!(store.get("nasa-apod-favorites").unwrap(), None);
        // Removing twice is fine
        store.remove("nasa-apod-favorites").unwrap();
    }

    #[test]
    fn test_file_store_sanitizes_keys() {
        let store = FileStore::new("/tmp/x");
        assert_eq!(store.path_for("../evil key"), PathBuf::from("/tmp/x/___evil_key.json"));
    }

    #[test]
    fn test_file_store_write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the directory should be
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, "not a directory").unwrap();

        let mut store = FileStore::new(&blocker);
        assert!(matches!(store.set("k", "v"), Err(Error::StorageError(_))));
    }

    #[test]
    fn test_memory_store_clones_share_state() {
        let mut a = MemoryStore::new();
        let b = a.clone();

        a.set("k", "v").unwrap();
        assert_eq!(b.get("k").unwrap().as_deref(), Some("v"));

        let seeded = MemoryStore::new().with_entry("k", "seed");
        assert_eq!(seeded.get("k").unwrap().as_deref(), Some("seed"));
    }
}
