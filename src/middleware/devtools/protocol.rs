//! Devtools wire protocol.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix of every diagnostic the devtools middleware logs.
pub const LOG_PREFIX: &str = "[devtools middleware]";

/// Action type reserved for setting state from the devtools.
pub const RESERVED_SET_STATE: &str = "__setState";

/// Inbound message from the debugger.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum DevtoolsMessage {
    /// A user-typed action. `payload` should be a JSON string.
    #[serde(rename = "ACTION")]
    Action { payload: Value },

    /// A monitor command.
    #[serde(rename = "DISPATCH")]
    Dispatch {
        payload: DispatchPayload,
        /// JSON-encoded state for ROLLBACK and the JUMP commands.
        #[serde(default)]
        state: Option<Value>,
    },
}

/// Monitor commands carried by `DISPATCH`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchPayload {
    Reset,
    Commit,
    Rollback,
    JumpToState,
    JumpToAction,
    ImportState {
        /// Forwarded back to the extension unchanged.
        #[serde(rename = "nextLiftedState")]
        next_lifted_state: Value,
    },
    PauseRecording,
    #[serde(other)]
    Unsupported,
}

/// The state of the last entry in a lifted state's `computedStates`.
pub fn last_computed_state(lifted: &Value) -> Option<&Value> {
    lifted
        .get("computedStates")?
        .as_array()?
        .last()?
        .get("state")
}

/// Outbound event, as recorded by channel-backed extensions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DevtoolsEvent {
    /// The debugger's view was (re)initialized with this state.
    Init { state: Value },

    /// A transition was recorded. `action` is `None` for imported histories.
    Send { action: Option<Value>, state: Value },
}
