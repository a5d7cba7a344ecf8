//! Reducer-driven stores.
//!
//! `redux(reducer, initial)` seeds the store with `initial` and adds a
//! `dispatch` capability: each dispatched action runs the reducer over the
//! current state and merges the result.

use crate::store::{Capability, StateCreator, StoreApi};
use crate::types::{Action, GetState, SetState, SharedState, Transition, Update};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// The `dispatch` capability.
#[derive(Clone)]
pub struct Dispatcher {
    dispatch: Arc<dyn Fn(Value) -> Value + Send + Sync>,
    from_devtools: bool,
}

impl Dispatcher {
    /// `from_devtools` marks a dispatcher that accepts actions typed into
    /// the debugger.
    pub fn new<F>(dispatch: F, from_devtools: bool) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self {
            dispatch: Arc::new(dispatch),
            from_devtools,
        }
    }

    /// Run an action; returns it unchanged.
    pub fn dispatch(&self, action: Value) -> Value {
        (self.dispatch)(action)
    }

    pub fn from_devtools(&self) -> bool {
        self.from_devtools
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("from_devtools", &self.from_devtools)
            .finish()
    }
}

/// Build a store from a reducer `(state, action) -> state`.
pub fn redux<R>(reducer: R, initial: Value) -> impl StateCreator
where
    R: Fn(&Value, &Value) -> Value + Send + Sync + 'static,
{
    move |set: SetState, _get: GetState, api: &StoreApi| -> Value {
        let reducer = Arc::new(reducer);
        api.provide(Capability::Dispatch(Dispatcher::new(
            move |action: Value| {
                let reducer = Arc::clone(&reducer);
                let reduce_with = action.clone();
                set(Transition {
                    update: Update::with(move |state: &SharedState| Arc::new(reducer(state, &reduce_with))),
                    replace: false,
                    action: Some(Action::Object(action.clone())),
                });
                action
            },
            true,
        )));
        initial
    }
}
