//! Persist middleware configuration.

use crate::deferred::Deferred;
use crate::error::{Result, StoreError};
use crate::shallow::shallow_merge;
use crate::types::SharedState;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::storage::PersistStorage;

/// Projects the state before it is written.
pub type PartializeFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Upgrades a persisted state written under an older version.
pub type MigrateFn = Arc<dyn Fn(Value, u32) -> Deferred<Result<Value>> + Send + Sync>;

/// Combines the persisted state (if any) with the current state.
pub type MergeFn = Arc<dyn Fn(Option<Value>, &SharedState) -> Value + Send + Sync>;

/// Called once hydration finishes, with the hydrated state or the error.
pub type PostRehydrateFn = Box<dyn FnOnce(Option<&SharedState>, Option<&StoreError>) + Send>;

/// Called before hydration starts; may return a callback for when it ends.
pub type OnRehydrateFn = Arc<dyn Fn(&SharedState) -> Option<PostRehydrateFn> + Send + Sync>;

/// Persist middleware configuration.
#[derive(Clone)]
pub struct PersistOptions {
    /// Storage key. Must be unique per store.
    pub name: String,

    /// Where envelopes go. `None` turns the middleware into a pass-through.
    pub storage: Option<Arc<dyn PersistStorage>>,

    /// Default: the whole state.
    pub partialize: PartializeFn,

    /// Version written with every envelope.
    /// Default: 0
    pub version: u32,

    pub migrate: Option<MigrateFn>,

    /// Default: shallow merge, persisted keys win.
    pub merge: MergeFn,

    pub on_rehydrate_storage: Option<OnRehydrateFn>,
}

impl PersistOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            storage: None,
            partialize: Arc::new(Value::clone),
            version: 0,
            migrate: None,
            merge: Arc::new(default_merge),
            on_rehydrate_storage: None,
        }
    }

    pub fn storage(mut self, storage: Arc<dyn PersistStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn partialize(mut self, f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        self.partialize = Arc::new(f);
        self
    }

    /// Synchronous migration.
    pub fn migrate(mut self, f: impl Fn(Value, u32) -> Result<Value> + Send + Sync + 'static) -> Self {
        self.migrate = Some(Arc::new(move |state, version| Deferred::ready(f(state, version))));
        self
    }

    /// Migration that may finish later.
    pub fn migrate_deferred(
        mut self,
        f: impl Fn(Value, u32) -> Deferred<Result<Value>> + Send + Sync + 'static,
    ) -> Self {
        self.migrate = Some(Arc::new(f));
        self
    }

    pub fn merge(mut self, f: impl Fn(Option<Value>, &SharedState) -> Value + Send + Sync + 'static) -> Self {
        self.merge = Arc::new(f);
        self
    }

    pub fn on_rehydrate_storage(
        mut self,
        f: impl Fn(&SharedState) -> Option<PostRehydrateFn> + Send + Sync + 'static,
    ) -> Self {
        self.on_rehydrate_storage = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for PersistOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistOptions")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("has_storage", &self.storage.is_some())
            .field("has_migrate", &self.migrate.is_some())
            .finish()
    }
}

/// Shallow merge with the persisted keys winning.
pub fn default_merge(persisted: Option<Value>, current: &SharedState) -> Value {
    match persisted {
        Some(persisted) => match shallow_merge(current, &persisted) {
            Some(merged) => merged,
            None if current.is_object() => Value::clone(current),
            None => persisted,
        },
        None => Value::clone(current),
    }
}
