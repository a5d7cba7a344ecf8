//! Persist middleware: write every transition to storage, hydrate on start.

use crate::deferred::Deferred;
use crate::error::{Result, StoreError};
use crate::store::{Capability, StateCreator, StoreApi};
use crate::subscriptions::{ListenerSet, Subscription};
use crate::types::{GetState, SetState, SharedState, Transition};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::options::{PersistOptions, PostRehydrateFn};
use super::storage::{PersistStorage, StorageValue};

type HydrationListener = dyn Fn(&SharedState) + Send + Sync;
type FinishListener = dyn Fn(std::result::Result<&SharedState, &StoreError>) + Send + Sync;

/// Shared state of one persisted store.
struct Persister {
    options: RwLock<PersistOptions>,
    storage: RwLock<Arc<dyn PersistStorage>>,
    has_hydrated: AtomicBool,
    hydrate_listeners: Arc<ListenerSet<HydrationListener>>,
    finish_listeners: Arc<ListenerSet<FinishListener>>,
    /// `set` from the layer below; does not persist.
    set: SetState,
    get: GetState,
    /// What the wrapped creator returned.
    constructed: Mutex<Option<SharedState>>,
    /// Result of a merge that finished while the creator was still running.
    hydrated: Mutex<Option<SharedState>>,
    constructing: AtomicBool,
}

impl Persister {
    fn storage(&self) -> Arc<dyn PersistStorage> {
        Arc::clone(&self.storage.read())
    }

    /// Write the current (partialized) state.
    fn set_item(&self) -> Deferred<Result<()>> {
        let (name, version, partialize) = {
            let options = self.options.read();
            (options.name.clone(), options.version, Arc::clone(&options.partialize))
        };
        let state = partialize(&(self.get)());
        self.storage().set_item(&name, StorageValue::new(state, version))
    }

    /// Fire-and-forget write.
    fn persist(&self) {
        let name = self.options.read().name.clone();
        self.set_item()
            .map(move |result| {
                if let Err(e) = result {
                    error!(name = %name, error = %e, "failed to persist state");
                }
            })
            .detach("persist write");
    }

    fn hydrate(self: &Arc<Self>) -> Deferred<()> {
        self.has_hydrated.store(false, Ordering::SeqCst);

        let current = (self.get)();
        for listener in self.hydrate_listeners.snapshot() {
            listener(&current);
        }

        let (name, on_rehydrate) = {
            let options = self.options.read();
            (options.name.clone(), options.on_rehydrate_storage.clone())
        };
        let post = on_rehydrate.and_then(|f| f(&current));
        debug!(name = %name, "hydrating");

        let migrate_step = Arc::clone(self);
        let merge_step = Arc::clone(self);
        let finish_step = Arc::clone(self);

        self.storage()
            .get_item(&name)
            .and_then_ok(move |stored| migrate_step.migrate(stored))
            .and_then_ok(move |migrated| merge_step.merge(migrated))
            .map(move |outcome| finish_step.finish(outcome, post))
    }

    /// Bring a stored envelope up to the configured version.
    fn migrate(&self, stored: Option<StorageValue>) -> Deferred<Result<Option<Value>>> {
        let Some(stored) = stored else {
            return Deferred::ready(Ok(None));
        };

        let (name, version, migrate) = {
            let options = self.options.read();
            (options.name.clone(), options.version, options.migrate.clone())
        };

        match stored.version {
            Some(stored_version) if stored_version != version => match migrate {
                Some(migrate) => {
                    debug!(name = %name, from = stored_version, to = version, "migrating persisted state");
                    migrate(stored.state, stored_version).map(|result| result.map(Some))
                }
                None => {
                    error!(
                        name = %name,
                        stored_version,
                        version,
                        "State loaded from storage couldn't be migrated since no migrate function was provided"
                    );
                    Deferred::ready(Ok(None))
                }
            },
            _ => Deferred::ready(Ok(Some(stored.state))),
        }
    }

    /// Merge into the live state, apply it, and write it back.
    fn merge(&self, migrated: Option<Value>) -> Deferred<Result<SharedState>> {
        let live = (self.get)();
        // A null state means the store is still being constructed.
        let current = if live.is_null() {
            self.constructed.lock().clone().unwrap_or(live)
        } else {
            live
        };

        let merge = Arc::clone(&self.options.read().merge);
        let merged = Arc::new(merge(migrated, &current));
        if self.constructing.load(Ordering::SeqCst) {
            *self.hydrated.lock() = Some(Arc::clone(&merged));
        }

        (self.set)(Transition::replace(Arc::clone(&merged)));
        self.set_item().map(move |result| result.map(|()| merged))
    }

    fn finish(&self, outcome: Result<SharedState>, post: Option<PostRehydrateFn>) {
        match outcome {
            Ok(state) => {
                if let Some(post) = post {
                    post(Some(&state), None);
                }
                self.has_hydrated.store(true, Ordering::SeqCst);
                for listener in self.finish_listeners.snapshot() {
                    listener(Ok(&state));
                }
            }
            Err(e) => {
                error!(name = %self.options.read().name, error = %e, "an error happened during hydration");
                if let Some(post) = post {
                    post(None, Some(&e));
                }
                for listener in self.finish_listeners.snapshot() {
                    listener(Err(&e));
                }
            }
        }
    }
}

/// The `persist` capability exposed on the store.
#[derive(Clone)]
pub struct PersistApi {
    inner: Arc<Persister>,
}

impl PersistApi {
    /// Reload from storage. Await (or detach) the result to drive async storage.
    pub fn rehydrate(&self) -> Deferred<()> {
        self.inner.hydrate()
    }

    pub fn has_hydrated(&self) -> bool {
        self.inner.has_hydrated.load(Ordering::SeqCst)
    }

    /// Called with the current state when hydration starts.
    pub fn on_hydrate<F>(&self, f: F) -> Subscription
    where
        F: Fn(&SharedState) + Send + Sync + 'static,
    {
        self.inner.hydrate_listeners.subscribe(Arc::new(f))
    }

    /// Called with the hydrated state, or the error, when hydration ends.
    pub fn on_finish_hydration<F>(&self, f: F) -> Subscription
    where
        F: Fn(std::result::Result<&SharedState, &StoreError>) + Send + Sync + 'static,
    {
        self.inner.finish_listeners.subscribe(Arc::new(f))
    }

    /// Remove the persisted entry.
    pub fn clear_storage(&self) {
        let name = self.inner.options.read().name.clone();
        self.inner
            .storage()
            .remove_item(&name)
            .map(move |result| {
                if let Err(e) = result {
                    error!(name = %name, error = %e, "failed to clear storage");
                }
            })
            .detach("clear storage");
    }

    pub fn get_options(&self) -> PersistOptions {
        self.inner.options.read().clone()
    }

    /// Update options in place. A new `storage` replaces the active one.
    ///
    /// `update` runs on a copy, so it may call back into the store.
    pub fn set_options(&self, update: impl FnOnce(&mut PersistOptions)) {
        let mut options = self.get_options();
        let previous = options.storage.clone();
        update(&mut options);

        let storage = match (&previous, &options.storage) {
            (Some(old), Some(new)) if Arc::ptr_eq(old, new) => None,
            (_, new) => new.clone(),
        };
        *self.inner.options.write() = options;

        if let Some(storage) = storage {
            *self.inner.storage.write() = storage;
        }
    }
}

impl fmt::Debug for PersistApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistApi")
            .field("options", &*self.inner.options.read())
            .field("has_hydrated", &self.has_hydrated())
            .finish()
    }
}

/// Persist the store through `options.storage` and hydrate it on creation.
pub fn persist(creator: impl StateCreator, options: PersistOptions) -> impl StateCreator {
    move |set: SetState, get: GetState, api: &StoreApi| -> Value {
        let Some(storage) = options.storage.clone() else {
            let warn_unavailable = move |name: &str| {
                warn!(
                    name = %name,
                    "Unable to update item, the given storage is currently unavailable"
                );
            };

            let name = options.name.clone();
            api.wrap_set_state(|next| {
                let name = name.clone();
                Arc::new(move |transition| {
                    warn_unavailable(&name);
                    next(transition);
                })
            });

            let warn_set: SetState = Arc::new(move |transition| {
                warn_unavailable(&name);
                set(transition);
            });
            return Box::new(creator).create(warn_set, get, api);
        };

        let persister = Arc::new(Persister {
            options: RwLock::new(options),
            storage: RwLock::new(storage),
            has_hydrated: AtomicBool::new(false),
            hydrate_listeners: ListenerSet::new(),
            finish_listeners: ListenerSet::new(),
            set: Arc::clone(&set),
            get: Arc::clone(&get),
            constructed: Mutex::new(None),
            hydrated: Mutex::new(None),
            constructing: AtomicBool::new(true),
        });

        api.wrap_set_state(|next| {
            let persister = Arc::clone(&persister);
            Arc::new(move |transition| {
                next(transition);
                persister.persist();
            })
        });

        let persisting_set: SetState = {
            let persister = Arc::clone(&persister);
            Arc::new(move |transition| {
                set(transition);
                persister.persist();
            })
        };

        let constructed = Box::new(creator).create(persisting_set, get, api);
        *persister.constructed.lock() = Some(Arc::new(constructed.clone()));

        api.provide(Capability::Persist(PersistApi {
            inner: Arc::clone(&persister),
        }));

        // Pending hydration must not land before the store holds its initial state.
        let hydration = persister.hydrate();
        if let Err(pending) = hydration.into_ready() {
            api.after_create(move || pending.detach("hydration"));
        }

        persister.constructing.store(false, Ordering::SeqCst);
        let hydrated = persister.hydrated.lock().take();
        match hydrated {
            Some(state) => Value::clone(&state),
            None => constructed,
        }
    }
}
