//! Durable key-value slot for the session flag.
//!
//! Only two keys live here (see [`crate::models::session::keys`]); everything
//! else is rebuilt from the document store on the next load.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::StorageError;

/// A small string-to-string store that survives restarts.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns error if the backing medium can't be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns error if the backing medium can't be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns error if the backing medium can't be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Key-value slot persisted as a JSON object in a single file.
///
/// The file is created on first write; a missing file reads as empty.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileKeyValueStore {
    /// Create a store backed by `path`. Nothing is touched until first use.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.guard();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.guard();
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.guard();
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

/// Volatile key-value slot, for tests and for callers that opt out of
/// persistence.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries().remove(key);
        Ok(())
    }
}
