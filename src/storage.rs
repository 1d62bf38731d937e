//! Local key-value storage holding values left by older clients.
//!
//! Only one key is read today: `username`, which older clients kept locally
//! before usernames moved to the server. It is migrated once and removed.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{OttError, Result};

/// Key under which older clients stored the unregistered username.
pub const LEGACY_USERNAME_KEY: &str = "username";

/// Local storage the client can read and clear entries from.
pub trait LegacyStorage: Send + Sync + 'static {
    /// Remove `key` and return its value, if any.
    ///
    /// # Errors
    ///
    /// Returns [`OttError::Storage`] if the backing store cannot be read or
    /// rewritten.
    fn take(&self, key: &str) -> Result<Option<String>>;
}

/// Storage that never holds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStorage;

impl LegacyStorage for NoStorage {
    fn take(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/// In-process storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for seeding tests.
    #[must_use]
    pub fn with_entry(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.into(), value.into());
        }
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .map(|entries| entries.contains_key(key))
            .unwrap_or(false)
    }
}

impl LegacyStorage for MemoryStorage {
    fn take(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| OttError::Storage("memory storage lock poisoned".into()))?;
        Ok(entries.remove(key))
    }
}

/// Storage backed by a flat JSON object on disk.
///
/// A missing file is treated as empty. Non-string values are ignored.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<Map<String, Value>> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(Map::new()),
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| OttError::Storage(format!("{}: {e}", self.path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(OttError::Io(e)),
        }
    }
}

impl LegacyStorage for JsonFileStorage {
    fn take(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.load()?;
        let Some(value) = entries.remove(key) else {
            return Ok(None);
        };
        std::fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;
        match value {
            Value::String(text) => Ok(Some(text)),
            other => {
                warn!(key, value = %other, "ignoring non-string legacy storage entry");
                Ok(None)
            }
        }
    }
}
