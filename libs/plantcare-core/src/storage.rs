//! Key-value persistence used by the data store
//!
//! The store treats storage as synchronous and always available; a failed
//! write is reported to the caller, which logs it and carries on.

use crate::error::{PlantCareError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Byte-oriented persistent key-value storage
pub trait KeyValueStore: Send + Sync {
    /// Read the bytes stored under `key`, `None` if absent or unreadable
    fn read_bytes(&self, key: &str) -> Option<Vec<u8>>;

    /// Store `bytes` under `key`, replacing the previous value
    ///
    /// # Errors
    /// Returns an error if the value cannot be written
    fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Remove the value stored under `key`
    ///
    /// # Errors
    /// Returns an error if the value exists but cannot be removed
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory storage, for previews and tests
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    values: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryKeyValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn read_bytes(&self, key: &str) -> Option<Vec<u8>> {
        self.values.read().get(key).cloned()
    }

    fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.values.write().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values.write().remove(key);
        Ok(())
    }
}

/// File-backed storage: one JSON file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Open (and create if needed) a storage directory
    ///
    /// # Errors
    /// Returns `InvalidDirectory` if the path exists but is not a directory, or
    /// an IO error if it cannot be created
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if dir.exists() && !dir.is_dir() {
            return Err(PlantCareError::InvalidDirectory {
                path: dir.display().to_string(),
            });
        }
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(PlantCareError::validation(format!(
                "Invalid storage key: {key:?}"
            )));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn read_bytes(&self, key: &str) -> Option<Vec<u8>> {
        let path = self.path_for(key).ok()?;
        match fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!("No stored value for {}: {}", key, e);
                None
            }
        }
    }

    fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        // Write beside the target and rename so readers never see a torn file
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryKeyValueStore::new();
        assert!(store.read_bytes("plants").is_none());

        store.write_bytes("plants", b"[]").unwrap();
        assert_eq!(store.read_bytes("plants").unwrap(), b"[]");
        assert!(store.contains_key("plants"));

        store.remove("plants").unwrap();
        assert!(!store.contains_key("plants"));
    }

    #[test]
    fn test_file_store_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::open(temp_dir.path().join("data")).unwrap();

        store.write_bytes("rooms", b"{\"a\":1}").unwrap();
        store.write_bytes("rooms", b"{\"a\":2}").unwrap();
        assert_eq!(store.read_bytes("rooms").unwrap(), b"{\"a\":2}");
        assert!(store.dir().join("rooms.json").exists());
        assert!(!store.dir().join("rooms.json.tmp").exists());

        store.remove("rooms").unwrap();
        assert!(store.read_bytes("rooms").is_none());
        store.remove("rooms").unwrap();
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::open(temp_dir.path()).unwrap();

        assert!(store.write_bytes("../escape", b"x").is_err());
        assert!(store.write_bytes("", b"x").is_err());
        assert!(store.read_bytes("a/b").is_none());
    }

    #[test]
    fn test_file_store_open_rejects_file_path() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("not-a-dir");
        fs::write(&file, b"x").unwrap();

        let result = FileKeyValueStore::open(&file);
        assert!(matches!(
            result,
            Err(PlantCareError::InvalidDirectory { .. })
        ));
    }
}
