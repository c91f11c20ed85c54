//! Key/value session storage persisted as a single JSON file.
//!
//! Holds small UI-session values (open tabs, theme, app config, cached WebDAV
//! credentials) outside the notebook database.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::Result;

/// Returns the default local store path.
///
/// - macOS / Linux: `~/.config/notebook/local-storage.json`
/// - Windows: `%APPDATA%/Notebook/local-storage.json`
pub fn default_local_store_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("Notebook").join("local-storage.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config").join("notebook").join("local-storage.json")
    }
}

/// A JSON-file-backed string map, or a purely in-memory one.
pub struct LocalStore {
    path: Option<PathBuf>,
    entries: Mutex<Map<String, Value>>,
}

impl LocalStore {
    /// Loads the store at `path`; a missing or corrupt file yields an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!("Ignoring unreadable local store {}: {e}", path.display());
                Map::new()
            }),
            Err(_) => Map::new(),
        };
        Self {
            path: Some(path),
            entries: Mutex::new(entries),
        }
    }

    /// A store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(Map::new()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Reads and deserializes `key`. Values of the wrong shape read as `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.entries().get(key).cloned()?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("Local store key '{key}' has unexpected shape: {e}");
                None
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries().contains_key(key)
    }

    /// Stores `value` under `key` and writes the file.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        let mut entries = self.entries();
        entries.insert(key.to_string(), value);
        self.flush(&entries)
    }

    /// Removes `key` and writes the file.
    pub fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries();
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }

    fn entries(&self) -> MutexGuard<'_, Map<String, Value>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn flush(&self, entries: &Map<String, Value>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("local.json");
        {
            let store = LocalStore::open(&path);
            store.set("selectedCategoryId", &Some("cat-1")).unwrap();
            store.set("count", &3u32).unwrap();
        }
        let store = LocalStore::open(&path);
        assert_eq!(
            store.get::<Option<String>>("selectedCategoryId"),
            Some(Some("cat-1".to_string()))
        );
        assert_eq!(store.get::<u32>("count"), Some(3));
    }

    #[test]
    fn test_remove_deletes_key_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("local.json");
        let store = LocalStore::open(&path);
        store.set("webdav_config", &"secret").unwrap();
        store.remove("webdav_config").unwrap();
        assert!(!LocalStore::open(&path).contains("webdav_config"));
    }

    #[test]
    fn test_corrupt_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("local.json");
        fs::write(&path, "{not json").unwrap();
        let store = LocalStore::open(&path);
        assert!(!store.contains("anything"));
    }

    #[test]
    fn test_wrong_shape_reads_as_none() {
        let store = LocalStore::in_memory();
        store.set("count", &"three").unwrap();
        assert_eq!(store.get::<u32>("count"), None);
        assert!(store.path().is_none());
    }
}
