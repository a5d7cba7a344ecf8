//! Draft-style updates.
//!
//! With this middleware a transition may carry an [`Update::Recipe`]: a
//! closure that mutates a draft copy of the current state. The recipe is
//! turned into an ordinary updater before the transition goes further down
//! the chain.

use crate::store::{StateCreator, StoreApi};
use crate::types::{GetState, SetState, SharedState, Transition, Update};
use serde_json::Value;
use std::sync::Arc;

/// Run `recipe` against a copy of `current`.
///
/// Returns `current` itself when the recipe left the draft unchanged.
pub fn produce(current: &SharedState, recipe: impl FnOnce(&mut Value)) -> SharedState {
    let mut draft = Value::clone(current);
    recipe(&mut draft);
    if draft == **current {
        Arc::clone(current)
    } else {
        Arc::new(draft)
    }
}

/// Accept draft recipes on every `set_state` path.
pub fn immer(creator: impl StateCreator) -> impl StateCreator {
    move |_set: SetState, get: GetState, api: &StoreApi| -> Value {
        api.wrap_set_state(|next| {
            Arc::new(move |transition: Transition| {
                let Transition {
                    update,
                    replace,
                    action,
                } = transition;
                let update = match update {
                    Update::Recipe(recipe) => Update::with(move |current| produce(current, recipe)),
                    other => other,
                };
                next(Transition {
                    update,
                    replace,
                    action,
                });
            })
        });

        Box::new(creator).create(api.current_set_state(), get, api)
    }
}
