//! Persistent key-value storage for bindings.
//!
//! The session only ever reads the binding keys once at start-up and writes
//! changed entries back; what sits behind [`KeyValueStore`] is up to the
//! host (browser storage, a JSON file, memory in tests).

use async_trait::async_trait;
use fieldmark_common::StoreError;
use fieldmark_core::store::{self, LocatorStore};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::fs;
use tracing::debug;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Values for the requested keys. Missing keys are absent from the map.
    async fn get(&self, keys: &[String]) -> Result<HashMap<String, String>, StoreError>;

    /// Writes every entry, leaving other keys untouched.
    async fn set(&self, entries: HashMap<String, String>) -> Result<(), StoreError>;
}

#[derive(Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: HashMap<String, String>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    /// Copy of everything stored.
    pub fn entries(&self) -> Result<HashMap<String, String>, StoreError> {
        let entries = self.entries.lock().map_err(poisoned)?;
        Ok(entries.clone())
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("memory store lock poisoned".to_string())
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, keys: &[String]) -> Result<HashMap<String, String>, StoreError> {
        let entries = self.entries.lock().map_err(poisoned)?;
        Ok(keys
            .iter()
            .filter_map(|key| entries.get(key).map(|value| (key.clone(), value.clone())))
            .collect())
    }

    async fn set(&self, updates: HashMap<String, String>) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        entries.extend(updates);
        Ok(())
    }
}

/// Flat JSON object on disk. Writes go to a sibling temp file that is then
/// renamed over the original.
pub struct FileKeyValueStore {
    path: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        if !fs::try_exists(&self.path).await? {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path).await?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, keys: &[String]) -> Result<HashMap<String, String>, StoreError> {
        let mut all = self.read_all().await?;
        Ok(keys
            .iter()
            .filter_map(|key| all.remove(key).map(|value| (key.clone(), value)))
            .collect())
    }

    async fn set(&self, updates: HashMap<String, String>) -> Result<(), StoreError> {
        let mut all = self.read_all().await?;
        all.extend(updates);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(&all)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), keys = all.len(), "Wrote store file");
        Ok(())
    }
}

/// Reads every binding key and rebuilds the binding table.
pub async fn load_bindings<S: KeyValueStore + ?Sized>(kv: &S) -> Result<LocatorStore, StoreError> {
    let entries = kv.get(&store::keys()).await?;
    Ok(LocatorStore::from_entries(&entries))
}

/// Writes changed bindings. Returns the number of keys written. Drained
/// entries are not retried if the write fails.
pub async fn save_pending<S: KeyValueStore + ?Sized>(
    kv: &S,
    bindings: &mut LocatorStore,
) -> Result<usize, StoreError> {
    if !bindings.has_pending() {
        return Ok(0);
    }
    let entries = bindings.take_pending();
    let count = entries.len();
    kv.set(entries).await?;
    Ok(count)
}
