//! Middlewares: state creators that wrap other state creators.
//!
//! Each one may wrap the store's `set_state` chain, hand a wrapped `set` to
//! the inner creator, and provide a capability on the api. They compose by
//! nesting, outermost first:
//!
//! ```ignore
//! let api = create_store(devtools(
//!     persist(immer(creator), PersistOptions::new("todos").storage(storage)),
//!     DevtoolsOptions::default().name("todos"),
//! ));
//! ```

pub mod devtools;
pub mod immer;
pub mod persist;
pub mod redux;
