//! # Statecraft
//!
//! A small observable state container with composable middlewares.
//!
//! ## Core Concepts
//!
//! - **Store**: One shared JSON state, replaced wholesale on every transition
//! - **Listeners**: Called with `(next, previous)` after each accepted transition
//! - **Selectors**: Listen to a derived slice of the state
//! - **Middlewares**: Persistence, devtools, draft updates, reducers
//!
//! ## Example
//!
//! ```ignore
//! use statecraft::{create_store, SetState, GetState, StoreApi, Transition, Update};
//!
//! let api = create_store(|set: SetState, get: GetState, _api: &StoreApi| {
//!     json!({ "count": 0 })
//! });
//!
//! let sub = api.subscribe(|next, prev| println!("{prev} -> {next}"));
//! api.set_state(Update::with(|s| Arc::new(json!({ "count": s["count"].as_i64().unwrap() + 1 }))), false);
//! sub.unsubscribe();
//! ```

pub mod deferred;
pub mod error;
pub mod middleware;
pub mod shallow;
pub mod store;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use deferred::{BoxFuture, Deferred};
pub use error::{Result, StoreError};
pub use middleware::devtools::{
    devtools, ChannelConnector, DevtoolsClient, DevtoolsConnector, DevtoolsEvent,
    DevtoolsExtension, DevtoolsHandle, DevtoolsOptions,
};
pub use middleware::immer::{immer, produce};
pub use middleware::persist::{
    create_json_storage, persist, FileStorage, JsonStorage, MemoryStorage, PersistApi,
    PersistOptions, PersistStorage, StateStorage, StorageValue,
};
pub use middleware::redux::{redux, Dispatcher};
pub use shallow::{shallow, shallow_merge};
pub use store::{create_store, create_store_with, Capability, StateCreator, StoreApi, WeakStoreApi};
pub use subscriptions::{EqualityFn, SelectorOptions, Subscription, SubscriptionId};
pub use types::*;
