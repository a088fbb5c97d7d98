//! Persisted key-value store.
//!
//! String keys map to JSON-serialized string values, the same shape browser
//! local storage uses. Storage failures stay inside this module: the typed
//! [`JsonStoreExt::load_or`] and [`JsonStoreExt::save`] helpers log them and
//! fall back, so callers never handle a [`StoreError`].

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;

/// Raw string storage.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set_item(&mut self, key: &str, value: String) -> Result<(), StoreError>;
    fn remove_item(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Typed JSON access with default-value fallback.
pub trait JsonStoreExt: KeyValueStore {
    /// Loads and deserializes `key`, returning `None` when it is absent or unreadable.
    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.get_item(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Failed to read {}: {}", key, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(source) => {
                let e = StoreError::Json {
                    key: key.to_string(),
                    source,
                };
                log::warn!("Ignoring stored value: {}", e);
                None
            }
        }
    }

    /// Loads `key`, or returns `default` when it is absent or unreadable.
    fn load_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.load(key).unwrap_or(default)
    }

    /// Serializes and writes `value`. Returns false when the write failed.
    fn save<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> bool {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(source) => {
                let e = StoreError::Json {
                    key: key.to_string(),
                    source,
                };
                log::error!("Failed to serialize {}: {}", key, e);
                return false;
            }
        };
        match self.set_item(key, raw) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to persist {}: {}", key, e);
                false
            }
        }
    }
}

impl<S: KeyValueStore + ?Sized> JsonStoreExt for S {}

/// In-memory store for tests.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: BTreeMap<String, String>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.items.insert(key.to_string(), value);
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StoreError> {
        self.items.remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object file.
///
/// Every write rewrites the whole file (write to a sibling temp file, then
/// rename). Concurrent writers are last-writer-wins.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    items: BTreeMap<String, String>,
}

impl FileStore {
    /// Opens the store file, starting empty when it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let items = read_items(&path)?;
        log::info!("Opened store {} ({} keys)", path.display(), items.len());
        Ok(Self { path, items })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the file, replacing the in-memory view.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        self.items = read_items(&self.path)?;
        log::debug!("Reloaded store {} ({} keys)", self.path.display(), self.items.len());
        Ok(())
    }

    fn flush(&self) -> Result<(), StoreError> {
        let body = serde_json::to_string_pretty(&self.items).map_err(|source| StoreError::Json {
            key: "<store>".to_string(),
            source,
        })?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn read_items(path: &Path) -> Result<BTreeMap<String, String>, StoreError> {
    let body = match fs::read_to_string(path) {
        Ok(body) => body,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(StoreError::Io(e)),
    };
    if body.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&body)
        .map_err(|e| StoreError::Corrupt(format!("{}: {}", path.display(), e)))
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.items.insert(key.to_string(), value);
        self.flush()
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StoreError> {
        if self.items.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

// === Keys ===

/// Profile key for a user.
pub fn profile_key(email: &str) -> String {
    format!("profile_{}", email)
}

/// Weight history key for a user.
pub fn weight_history_key(email: &str) -> String {
    format!("weight_history_{}", email)
}

/// Keys for the three parallel weekly arrays and the handed-off targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerKeys {
    pub calories: String,
    pub exercise: String,
    pub foods: String,
    pub params: String,
}

impl PlannerKeys {
    /// User-scoped keys, or the unkeyed single-user fallback when no email is set.
    pub fn for_user(email: Option<&str>) -> Self {
        match email {
            Some(email) => Self {
                calories: format!("planner_{}_calories", email),
                exercise: format!("planner_{}_exercise", email),
                foods: format!("planner_{}_foods", email),
                params: format!("planner_{}_params", email),
            },
            None => Self {
                calories: "weeklyCalories".to_string(),
                exercise: "weeklyExercise".to_string(),
                foods: "weeklyFoods".to_string(),
                params: "plannerParams".to_string(),
            },
        }
    }
}
