//! Persistence middleware.
//!
//! Every transition writes `{ state: partialize(state), version }` to a
//! storage adapter. On creation the store hydrates from that storage:
//!
//! 1. Hydrate listeners fire with the current state
//! 2. The stored envelope is read (sync or async)
//! 3. Older versions go through `migrate`; without one the envelope is
//!    discarded and an error is logged
//! 4. The result is merged into the live state and written back
//! 5. Finish listeners fire with the merged state or the error
//!
//! # Example
//!
//! ```ignore
//! let storage = create_json_storage(|| Ok(Arc::new(MemoryStorage::new()) as Arc<dyn StateStorage>));
//! let api = create_store(persist(
//!     |_set, _get, _api: &StoreApi| json!({ "count": 0 }),
//!     PersistOptions::new("counter").storage(storage.unwrap()).version(1),
//! ));
//! assert!(api.persist().unwrap().has_hydrated());
//! ```

mod file;
mod middleware;
mod options;
mod storage;

pub use file::FileStorage;
pub use middleware::{persist, PersistApi};
pub use options::{
    default_merge, MergeFn, MigrateFn, OnRehydrateFn, PartializeFn, PersistOptions,
    PostRehydrateFn,
};
pub use storage::{
    create_json_storage, JsonStorage, MemoryStorage, PersistStorage, StateStorage, StorageValue,
};
