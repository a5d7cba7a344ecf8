//! Seams between the devtools middleware and a debugger.

use serde_json::Value;
use std::sync::Arc;

use super::options::DevtoolsOptions;

/// Receives raw inbound protocol messages.
pub type MessageHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Opens a connection to a debugger.
pub trait DevtoolsConnector: Send + Sync {
    /// `None` when no debugger is reachable.
    fn connect(&self, options: &DevtoolsOptions) -> Option<Arc<dyn DevtoolsExtension>>;
}

/// A connected debugger.
pub trait DevtoolsExtension: Send + Sync {
    /// Reset the debugger's history to `state`.
    fn init(&self, state: &Value);

    /// Record a transition. `action` is `None` when forwarding a lifted state.
    fn send(&self, action: Option<&Value>, state: &Value);

    /// Route inbound messages to `handler`.
    fn subscribe(&self, handler: MessageHandler);
}
