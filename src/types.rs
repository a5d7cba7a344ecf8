//! Core types shared by the store and its middlewares.

use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

/// The store's state value.
///
/// Identity (`Arc::ptr_eq`) is what decides whether a transition happened,
/// never deep equality.
pub type SharedState = Arc<Value>;

/// Callback invoked with `(next, previous)` after every accepted transition.
pub type Listener = Arc<dyn Fn(&SharedState, &SharedState) + Send + Sync>;

/// The `set` half of the triple handed to state creators.
pub type SetState = Arc<dyn Fn(Transition) + Send + Sync>;

/// The `get` half of the triple handed to state creators.
pub type GetState = Arc<dyn Fn() -> SharedState + Send + Sync>;

/// Computes a candidate state from the current one.
pub type Updater = Box<dyn FnOnce(&SharedState) -> SharedState + Send>;

/// Mutates a draft copy of the current state.
pub type Recipe = Box<dyn FnOnce(&mut Value) + Send>;

/// How the next state is derived.
pub enum Update {
    /// Use this value as the candidate.
    State(SharedState),
    /// Derive the candidate from the current state.
    Updater(Updater),
    /// Mutate a draft of the current state. Needs the immer middleware.
    Recipe(Recipe),
}

impl Update {
    pub fn with<F>(f: F) -> Self
    where
        F: FnOnce(&SharedState) -> SharedState + Send + 'static,
    {
        Update::Updater(Box::new(f))
    }

    pub fn draft<F>(f: F) -> Self
    where
        F: FnOnce(&mut Value) + Send + 'static,
    {
        Update::Recipe(Box::new(f))
    }
}

impl From<Value> for Update {
    fn from(value: Value) -> Self {
        Update::State(Arc::new(value))
    }
}

impl From<SharedState> for Update {
    fn from(state: SharedState) -> Self {
        Update::State(state)
    }
}

impl From<&SharedState> for Update {
    fn from(state: &SharedState) -> Self {
        Update::State(Arc::clone(state))
    }
}

impl fmt::Debug for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::State(state) => f.debug_tuple("State").field(state).finish(),
            Update::Updater(_) => f.write_str("Updater(..)"),
            Update::Recipe(_) => f.write_str("Recipe(..)"),
        }
    }
}

/// Label attached to a transition, reported to the devtools.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// Sent as `{ "type": name }`.
    Named(String),
    /// An action object (e.g. a dispatched redux action), sent as-is.
    Object(Value),
}

impl Action {
    /// The wire form of this label.
    pub fn to_value(&self) -> Value {
        match self {
            Action::Named(name) => json!({ "type": name }),
            Action::Object(value) => value.clone(),
        }
    }

    /// The `type` of this action, if it has a string one.
    pub fn action_type(&self) -> Option<&str> {
        match self {
            Action::Named(name) => Some(name),
            Action::Object(value) => value.get("type").and_then(Value::as_str),
        }
    }
}

impl From<&str> for Action {
    fn from(name: &str) -> Self {
        Action::Named(name.to_string())
    }
}

impl From<String> for Action {
    fn from(name: String) -> Self {
        Action::Named(name)
    }
}

impl From<Value> for Action {
    fn from(value: Value) -> Self {
        Action::Object(value)
    }
}

/// A requested state change travelling down the middleware chain.
#[derive(Debug)]
pub struct Transition {
    pub update: Update,
    /// Use the candidate as-is instead of shallow-merging it.
    pub replace: bool,
    pub action: Option<Action>,
}

impl Transition {
    /// Shallow-merge the candidate into the current state.
    pub fn merge(update: impl Into<Update>) -> Self {
        Self {
            update: update.into(),
            replace: false,
            action: None,
        }
    }

    /// Replace the current state with the candidate.
    pub fn replace(update: impl Into<Update>) -> Self {
        Self {
            update: update.into(),
            replace: true,
            action: None,
        }
    }

    pub fn labeled(mut self, action: impl Into<Action>) -> Self {
        self.action = Some(action.into());
        self
    }
}
