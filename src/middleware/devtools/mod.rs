//! Devtools middleware.
//!
//! Mirrors every transition to a time-travel debugger and applies the
//! debugger's commands (reset, commit, rollback, jumps, import, pause)
//! back onto the store. The debugger is reached through a
//! [`DevtoolsConnector`]; [`ChannelConnector`] provides an in-process one.

mod channel;
mod extension;
mod middleware;
mod options;
mod protocol;

pub use channel::{ChannelConnector, DevtoolsClient};
pub use extension::{DevtoolsConnector, DevtoolsExtension, MessageHandler};
pub use middleware::{devtools, DevtoolsHandle};
pub use options::DevtoolsOptions;
pub use protocol::{
    last_computed_state, DevtoolsEvent, DevtoolsMessage, DispatchPayload, LOG_PREFIX,
    RESERVED_SET_STATE,
};
