//! String key-value persistence for player settings and the cache
//! descriptor.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{StoreError, StoreResult};

/// Key for the player's API key.
pub const API_KEY_KEY: &str = "gemini_api_key";
/// Key for the player's preferred model.
pub const MODEL_KEY: &str = "gemini_model";
/// Key for the serialized [`CacheDescriptor`](crate::CacheDescriptor).
pub const CACHE_KEY: &str = "gemini_cache_info";

/// A synchronous string store.
pub trait KeyValueStore: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;
    /// Delete a value. Deleting an absent key is not an error.
    fn remove(&self, key: &str) -> StoreResult<()>;

    /// The stored API key, ignoring blank values.
    fn api_key(&self) -> StoreResult<Option<String>> {
        Ok(self
            .get(API_KEY_KEY)?
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty()))
    }

    /// The stored model, or [`DEFAULT_MODEL`](crate::DEFAULT_MODEL).
    fn model(&self) -> StoreResult<String> {
        Ok(self
            .get(MODEL_KEY)?
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| crate::DEFAULT_MODEL.to_string()))
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        (**self).remove(key)
    }
}

/// In-process store, used by tests and one-shot sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.values().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.values().remove(key);
        Ok(())
    }
}

/// A store persisted as a flat JSON object on disk.
///
/// Every write rewrites the whole file. A missing file reads as empty.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Store backed by `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store under the user's config directory, falling back to the
    /// current directory.
    pub fn default_location() -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join("idiom-quest").join("settings.json"))
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> StoreResult<BTreeMap<String, String>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> StoreResult<()> {
        let io = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io)?;
        }
        let text = serde_json::to_string_pretty(values).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, text).map_err(io)
    }

    fn update(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> StoreResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut values = self.read_all()?;
        f(&mut values);
        tracing::debug!(path = %self.path.display(), keys = values.len(), "writing settings");
        self.write_all(&values)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.update(|values| {
            values.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").unwrap(), None);
        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        store.remove("a").unwrap();
        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn settings_defaults() {
        let store = MemoryStore::new();
        assert_eq!(store.api_key().unwrap(), None);
        assert_eq!(store.model().unwrap(), "gemini-2.5-pro");

        store.set(API_KEY_KEY, "   ").unwrap();
        assert_eq!(store.api_key().unwrap(), None);
        store.set(API_KEY_KEY, " abc ").unwrap();
        assert_eq!(store.api_key().unwrap().as_deref(), Some("abc"));

        store.set(MODEL_KEY, "gemini-2.5-flash").unwrap();
        assert_eq!(store.model().unwrap(), "gemini-2.5-flash");
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let store = JsonFileStore::new(&path);
        assert_eq!(store.get(MODEL_KEY).unwrap(), None);
        store.set(MODEL_KEY, "gemini-2.5-flash").unwrap();
        store.set(API_KEY_KEY, "k").unwrap();
        store.remove(API_KEY_KEY).unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(
            reopened.get(MODEL_KEY).unwrap().as_deref(),
            Some("gemini-2.5-flash")
        );
        assert_eq!(reopened.get(API_KEY_KEY).unwrap(), None);
    }

    #[test]
    fn file_store_reports_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "[1, 2").unwrap();
        let err = JsonFileStore::new(&path).get(MODEL_KEY).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}
