//! Devtools middleware: record transitions and obey time-travel commands.

use crate::middleware::redux::Dispatcher;
use crate::store::{Capability, StateCreator, StoreApi};
use crate::types::{GetState, SetState, SharedState, Transition};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::extension::DevtoolsExtension;
use super::options::DevtoolsOptions;
use super::protocol::{
    last_computed_state, DevtoolsMessage, DispatchPayload, LOG_PREFIX, RESERVED_SET_STATE,
};

struct DevtoolsState {
    extension: Arc<dyn DevtoolsExtension>,
    is_recording: AtomicBool,
    /// What the wrapped creator returned; RESET goes back here.
    initial: Mutex<SharedState>,
    warned_reserved: AtomicBool,
    anonymous_label: String,
}

impl DevtoolsState {
    /// Apply a transition through the full chain without recording it.
    fn set_from_devtools(&self, api: &StoreApi, transition: Transition) {
        let was_recording = self.is_recording.swap(false, Ordering::SeqCst);
        api.apply(transition);
        self.is_recording.store(was_recording, Ordering::SeqCst);
    }

    fn handle(&self, api: &StoreApi, raw: &Value) {
        let message: DevtoolsMessage = match serde_json::from_value(raw.clone()) {
            Ok(message) => message,
            Err(e) => {
                debug!("{} ignoring unsupported message: {}", LOG_PREFIX, e);
                return;
            }
        };

        match message {
            DevtoolsMessage::Action { payload } => self.handle_action(api, payload),
            DevtoolsMessage::Dispatch { payload, state } => self.handle_dispatch(api, payload, state),
        }
    }

    fn handle_action(&self, api: &StoreApi, payload: Value) {
        let Value::String(payload) = payload else {
            error!("{} Unsupported action format", LOG_PREFIX);
            return;
        };
        let Some(action) = parse_json(&payload) else {
            return;
        };

        if action.get("type").and_then(Value::as_str) == Some(RESERVED_SET_STATE) {
            match action.get("state") {
                Some(partial) => self.set_from_devtools(api, Transition::merge(partial.clone())),
                None => debug!("{} {} without state, ignoring", LOG_PREFIX, RESERVED_SET_STATE),
            }
            return;
        }

        match api.dispatcher() {
            Some(dispatcher) if dispatcher.from_devtools() => {
                dispatcher.dispatch(action);
            }
            _ => debug!("{} no dispatcher accepts devtools actions, ignoring", LOG_PREFIX),
        }
    }

    fn handle_dispatch(&self, api: &StoreApi, payload: DispatchPayload, state: Option<Value>) {
        match payload {
            DispatchPayload::Reset => {
                let initial = Arc::clone(&self.initial.lock());
                self.set_from_devtools(api, Transition::replace(initial));
                self.extension.init(&api.get_state());
            }
            DispatchPayload::Commit => self.extension.init(&api.get_state()),
            DispatchPayload::Rollback => {
                if let Some(state) = parse_state(state) {
                    self.set_from_devtools(api, Transition::merge(state));
                    self.extension.init(&api.get_state());
                }
            }
            DispatchPayload::JumpToState | DispatchPayload::JumpToAction => {
                if let Some(state) = parse_state(state) {
                    self.set_from_devtools(api, Transition::merge(state));
                }
            }
            DispatchPayload::ImportState { next_lifted_state } => {
                let Some(last) = last_computed_state(&next_lifted_state) else {
                    return;
                };
                self.set_from_devtools(api, Transition::merge(last.clone()));
                self.extension.send(None, &next_lifted_state);
            }
            DispatchPayload::PauseRecording => {
                let recording = !self.is_recording.load(Ordering::SeqCst);
                self.is_recording.store(recording, Ordering::SeqCst);
                debug!(recording, "{} recording toggled", LOG_PREFIX);
            }
            DispatchPayload::Unsupported => debug!("{} unsupported monitor command, ignoring", LOG_PREFIX),
        }
    }
}

fn parse_json(raw: &str) -> Option<Value> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            error!("{} Could not parse the received json: {}", LOG_PREFIX, e);
            None
        }
    }
}

fn parse_state(state: Option<Value>) -> Option<Value> {
    match state {
        Some(Value::String(raw)) => parse_json(&raw),
        other => {
            error!("{} Could not parse the received json: expected a string, got {:?}", LOG_PREFIX, other);
            None
        }
    }
}

/// The `devtools` capability exposed on the store.
#[derive(Clone)]
pub struct DevtoolsHandle {
    inner: Arc<DevtoolsState>,
}

impl DevtoolsHandle {
    pub fn is_recording(&self) -> bool {
        self.inner.is_recording.load(Ordering::SeqCst)
    }

    pub fn initial_state(&self) -> SharedState {
        Arc::clone(&self.inner.initial.lock())
    }

    /// Feed an inbound protocol message, as the debugger would.
    pub fn handle_message(&self, api: &StoreApi, message: &Value) {
        self.inner.handle(api, message);
    }
}

impl fmt::Debug for DevtoolsHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DevtoolsHandle")
            .field("is_recording", &self.is_recording())
            .finish()
    }
}

/// Connect the store to a time-travel debugger.
///
/// Without a reachable debugger this is a pass-through.
pub fn devtools(creator: impl StateCreator, options: DevtoolsOptions) -> impl StateCreator {
    move |set: SetState, get: GetState, api: &StoreApi| -> Value {
        let extension = if options.is_enabled() {
            options
                .connector
                .as_ref()
                .and_then(|connector| connector.connect(&options))
        } else {
            None
        };

        let Some(extension) = extension else {
            if cfg!(debug_assertions) && options.enabled == Some(true) {
                warn!("{} Please install/enable the devtools extension", LOG_PREFIX);
            }
            return Box::new(creator).create(set, get, api);
        };

        let state = Arc::new(DevtoolsState {
            extension: Arc::clone(&extension),
            is_recording: AtomicBool::new(true),
            initial: Mutex::new(Arc::new(Value::Null)),
            warned_reserved: AtomicBool::new(false),
            anonymous_label: options.anonymous_label().to_string(),
        });

        api.wrap_set_state(|next| {
            let state = Arc::clone(&state);
            let get = Arc::clone(&get);
            Arc::new(move |transition: Transition| {
                let action = match &transition.action {
                    Some(action) => action.to_value(),
                    None => json!({ "type": state.anonymous_label }),
                };
                next(transition);
                if state.is_recording.load(Ordering::SeqCst) {
                    state.extension.send(Some(&action), &get());
                }
            })
        });

        let initial = Box::new(creator).create(api.current_set_state(), get, api);
        *state.initial.lock() = Arc::new(initial.clone());
        extension.init(&initial);

        if let Some(dispatcher) = api.dispatcher().filter(Dispatcher::from_devtools) {
            let state = Arc::clone(&state);
            api.provide(Capability::Dispatch(Dispatcher::new(
                move |action: Value| {
                    let reserved = action.get("type").and_then(Value::as_str) == Some(RESERVED_SET_STATE);
                    if cfg!(debug_assertions) && reserved && !state.warned_reserved.swap(true, Ordering::SeqCst) {
                        warn!(
                            "{} \"{}\" action type is reserved to set state from the devtools. Avoid using it.",
                            LOG_PREFIX, RESERVED_SET_STATE
                        );
                    }
                    dispatcher.dispatch(action)
                },
                true,
            )));
        }

        api.provide(Capability::Devtools(DevtoolsHandle {
            inner: Arc::clone(&state),
        }));

        let weak_api = api.downgrade();
        let weak_state = Arc::downgrade(&state);
        extension.subscribe(Arc::new(move |message: &Value| {
            if let (Some(api), Some(state)) = (weak_api.upgrade(), weak_state.upgrade()) {
                state.handle(&api, message);
            }
        }));

        initial
    }
}
