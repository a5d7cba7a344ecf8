//! The store core and the api handle middlewares build on.

use crate::error::{Result, StoreError};
use crate::middleware::devtools::DevtoolsHandle;
use crate::middleware::persist::PersistApi;
use crate::middleware::redux::Dispatcher;
use crate::shallow::shallow_merge;
use crate::subscriptions::{ListenerSet, Subscription};
use crate::types::{Action, GetState, Listener, SetState, SharedState, Transition, Update};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// Builds the initial state from the `(set, get, api)` triple.
///
/// Middlewares are state creators that wrap another state creator.
pub trait StateCreator: Send + 'static {
    fn create(self: Box<Self>, set: SetState, get: GetState, api: &StoreApi) -> Value;
}

impl<F> StateCreator for F
where
    F: FnOnce(SetState, GetState, &StoreApi) -> Value + Send + 'static,
{
    fn create(self: Box<Self>, set: SetState, get: GetState, api: &StoreApi) -> Value {
        (*self)(set, get, api)
    }
}

/// State value plus listener registry.
struct StoreCore {
    state: RwLock<SharedState>,
    listeners: Arc<ListenerSet<dyn Fn(&SharedState, &SharedState) + Send + Sync>>,
}

impl StoreCore {
    fn new() -> Self {
        Self {
            state: RwLock::new(Arc::new(Value::Null)),
            listeners: ListenerSet::new(),
        }
    }

    fn get_state(&self) -> SharedState {
        Arc::clone(&self.state.read())
    }

    /// Apply a transition and notify listeners.
    fn apply(&self, transition: Transition) {
        let Transition { update, replace, .. } = transition;
        let current = self.get_state();

        let candidate = match update {
            Update::State(state) => state,
            Update::Updater(f) => f(&current),
            Update::Recipe(_) => {
                warn!("draft updates need the immer middleware, ignoring transition");
                return;
            }
        };

        if Arc::ptr_eq(&candidate, &current) {
            return;
        }

        let next = if replace {
            candidate
        } else {
            match shallow_merge(&current, &candidate) {
                Some(merged) => Arc::new(merged),
                None => candidate,
            }
        };

        let previous = std::mem::replace(&mut *self.state.write(), Arc::clone(&next));

        for listener in self.listeners.snapshot() {
            listener(&next, &previous);
        }
    }
}

/// A capability a middleware adds to the store.
#[derive(Clone)]
pub enum Capability {
    Persist(PersistApi),
    Dispatch(Dispatcher),
    Devtools(DevtoolsHandle),
}

struct ApiInner {
    core: Arc<StoreCore>,
    /// Head of the `set_state` chain. Middlewares wrap it.
    set_state: RwLock<SetState>,
    /// In provision order; later entries shadow earlier ones.
    capabilities: RwLock<Vec<Capability>>,
    /// Work waiting for the initial state. `None` once the store is created.
    on_created: Mutex<Option<Vec<Box<dyn FnOnce() + Send>>>>,
}

/// Handle to a store.
///
/// Cloning is cheap; all clones refer to the same store.
#[derive(Clone)]
pub struct StoreApi {
    inner: Arc<ApiInner>,
}

/// Non-owning reference to a store, for callbacks held by external parties.
#[derive(Clone)]
pub struct WeakStoreApi {
    inner: Weak<ApiInner>,
}

impl WeakStoreApi {
    pub fn upgrade(&self) -> Option<StoreApi> {
        self.inner.upgrade().map(|inner| StoreApi { inner })
    }
}

impl StoreApi {
    fn new() -> Self {
        let core = Arc::new(StoreCore::new());
        let base: SetState = {
            let core = Arc::clone(&core);
            Arc::new(move |transition| core.apply(transition))
        };

        Self {
            inner: Arc::new(ApiInner {
                core,
                set_state: RwLock::new(base),
                capabilities: RwLock::new(Vec::new()),
                on_created: Mutex::new(Some(Vec::new())),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakStoreApi {
        WeakStoreApi {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // --- State ---

    pub fn get_state(&self) -> SharedState {
        self.inner.core.get_state()
    }

    /// Shallow-merge (or replace) the state and notify listeners.
    pub fn set_state(&self, update: impl Into<Update>, replace: bool) {
        self.apply(Transition {
            update: update.into(),
            replace,
            action: None,
        });
    }

    /// Like `set_state`, with a label reported to the devtools.
    pub fn set_state_named(&self, update: impl Into<Update>, replace: bool, action: impl Into<Action>) {
        self.apply(Transition {
            update: update.into(),
            replace,
            action: Some(action.into()),
        });
    }

    /// Run a transition through the full middleware chain.
    pub fn apply(&self, transition: Transition) {
        let set_state = self.current_set_state();
        set_state(transition);
    }

    /// The current head of the `set_state` chain.
    pub fn current_set_state(&self) -> SetState {
        Arc::clone(&self.inner.set_state.read())
    }

    /// Replace the head of the `set_state` chain with a wrapper around it.
    pub fn wrap_set_state(&self, wrap: impl FnOnce(SetState) -> SetState) {
        let mut head = self.inner.set_state.write();
        let next = Arc::clone(&head);
        *head = wrap(next);
    }

    fn base_get(&self) -> GetState {
        let core = Arc::clone(&self.inner.core);
        Arc::new(move || core.get_state())
    }

    fn initialize(&self, initial: Value) {
        *self.inner.core.state.write() = Arc::new(initial);

        let hooks = self.inner.on_created.lock().take().unwrap_or_default();
        for hook in hooks {
            hook();
        }
    }

    /// Run `f` once the store holds its initial state.
    ///
    /// Runs immediately when the store has already been created.
    pub fn after_create(&self, f: impl FnOnce() + Send + 'static) {
        if let Some(hooks) = self.inner.on_created.lock().as_mut() {
            hooks.push(Box::new(f));
            return;
        }
        f();
    }

    // --- Subscriptions ---

    /// Register a listener called with `(next, previous)` on every transition.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SharedState, &SharedState) + Send + Sync + 'static,
    {
        self.inner.core.listeners.subscribe(Arc::new(listener))
    }

    /// Register a shared listener. Registering the same `Arc` twice is a no-op.
    pub fn subscribe_listener(&self, listener: Listener) -> Subscription {
        self.inner.core.listeners.subscribe(listener)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.core.listeners.len()
    }

    /// Drop every listener. The state stays readable.
    pub fn destroy(&self) {
        self.inner.core.listeners.clear();
        debug!("store destroyed");
    }

    // --- Capabilities ---

    /// Add a capability; it shadows earlier capabilities of the same kind.
    pub fn provide(&self, capability: Capability) {
        self.inner.capabilities.write().push(capability);
    }

    pub fn capabilities(&self) -> Vec<Capability> {
        self.inner.capabilities.read().clone()
    }

    fn find<T>(&self, pick: impl Fn(&Capability) -> Option<T>) -> Option<T> {
        self.inner.capabilities.read().iter().rev().find_map(pick)
    }

    pub fn persist(&self) -> Option<PersistApi> {
        self.find(|c| match c {
            Capability::Persist(p) => Some(p.clone()),
            _ => None,
        })
    }

    pub fn dispatcher(&self) -> Option<Dispatcher> {
        self.find(|c| match c {
            Capability::Dispatch(d) => Some(d.clone()),
            _ => None,
        })
    }

    pub fn devtools(&self) -> Option<DevtoolsHandle> {
        self.find(|c| match c {
            Capability::Devtools(d) => Some(d.clone()),
            _ => None,
        })
    }

    /// Dispatch an action through the reducer middleware.
    pub fn dispatch(&self, action: Value) -> Result<Value> {
        let dispatcher = self
            .dispatcher()
            .ok_or(StoreError::CapabilityMissing("dispatch"))?;
        Ok(dispatcher.dispatch(action))
    }
}

/// Create a store from a (possibly middleware-wrapped) state creator.
pub fn create_store(creator: impl StateCreator) -> StoreApi {
    let api = StoreApi::new();
    let initial = Box::new(creator).create(api.current_set_state(), api.base_get(), &api);
    api.initialize(initial);
    api
}

/// Create a store holding `initial`, with no middleware.
pub fn create_store_with(initial: Value) -> StoreApi {
    create_store(move |_set: SetState, _get: GetState, _api: &StoreApi| initial)
}
