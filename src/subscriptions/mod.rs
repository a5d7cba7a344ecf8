//! Subscription system for state change notifications.
//!
//! This module provides:
//! - An ordered, identity-deduplicated listener registry
//! - Idempotent unsubscribe handles
//! - Selector subscriptions that only fire when a derived slice changes
//!
//! # Example
//!
//! ```ignore
//! let sub = api.subscribe_with_selector(
//!     |state| state["count"].clone(),
//!     |next, prev| println!("count {prev} -> {next}"),
//!     SelectorOptions::default().fire_immediately(true),
//! );
//!
//! api.set_state(json!({ "count": 1 }), false);
//! sub.unsubscribe();
//! ```

mod manager;
mod selector;
mod types;

pub use manager::ListenerSet;
pub use types::{EqualityFn, SelectorOptions, Subscription, SubscriptionId};
