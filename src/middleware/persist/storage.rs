//! Storage adapters for the persist middleware.

use crate::deferred::Deferred;
use crate::error::{Result, StoreError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// The persisted envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StorageValue {
    pub state: Value,

    /// Absent on envelopes written without a version; those never count as
    /// a version mismatch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

impl StorageValue {
    pub fn new(state: Value, version: u32) -> Self {
        Self {
            state,
            version: Some(version),
        }
    }
}

/// Envelope-level storage used by the persist middleware.
pub trait PersistStorage: Send + Sync {
    fn get_item(&self, name: &str) -> Deferred<Result<Option<StorageValue>>>;
    fn set_item(&self, name: &str, value: StorageValue) -> Deferred<Result<()>>;
    fn remove_item(&self, name: &str) -> Deferred<Result<()>>;
}

/// String key-value storage, shaped like a browser's `localStorage`.
pub trait StateStorage: Send + Sync {
    fn get_item(&self, name: &str) -> Deferred<Result<Option<String>>>;
    fn set_item(&self, name: &str, value: String) -> Deferred<Result<()>>;
    fn remove_item(&self, name: &str) -> Deferred<Result<()>>;
}

/// JSON envelope codec over a string storage.
pub struct JsonStorage {
    storage: Arc<dyn StateStorage>,
}

impl JsonStorage {
    pub fn new(storage: Arc<dyn StateStorage>) -> Self {
        Self { storage }
    }
}

impl PersistStorage for JsonStorage {
    fn get_item(&self, name: &str) -> Deferred<Result<Option<StorageValue>>> {
        self.storage
            .get_item(name)
            .map(|raw| -> Result<Option<StorageValue>> {
                match raw? {
                    Some(s) => Ok(Some(serde_json::from_str(&s)?)),
                    None => Ok(None),
                }
            })
    }

    fn set_item(&self, name: &str, value: StorageValue) -> Deferred<Result<()>> {
        match serde_json::to_string(&value) {
            Ok(encoded) => self.storage.set_item(name, encoded),
            Err(e) => Deferred::ready(Err(StoreError::Serialization(e.to_string()))),
        }
    }

    fn remove_item(&self, name: &str) -> Deferred<Result<()>> {
        self.storage.remove_item(name)
    }
}

/// Wrap the storage produced by `get_storage` in a JSON codec.
///
/// Returns `None` when the storage cannot be obtained, which makes the
/// persist middleware fall back to a pass-through.
pub fn create_json_storage<F>(get_storage: F) -> Option<Arc<dyn PersistStorage>>
where
    F: FnOnce() -> Result<Arc<dyn StateStorage>>,
{
    match get_storage() {
        Ok(storage) => Some(Arc::new(JsonStorage::new(storage))),
        Err(e) => {
            tracing::debug!(error = %e, "storage unavailable");
            None
        }
    }
}

/// Synchronous in-memory string storage.
#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored string for `name`.
    pub fn raw(&self, name: &str) -> Option<String> {
        self.items.lock().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl StateStorage for MemoryStorage {
    fn get_item(&self, name: &str) -> Deferred<Result<Option<String>>> {
        Deferred::ready(Ok(self.raw(name)))
    }

    fn set_item(&self, name: &str, value: String) -> Deferred<Result<()>> {
        self.items.lock().insert(name.to_string(), value);
        Deferred::ready(Ok(()))
    }

    fn remove_item(&self, name: &str) -> Deferred<Result<()>> {
        self.items.lock().remove(name);
        Deferred::ready(Ok(()))
    }
}
