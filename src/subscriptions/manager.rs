//! Listener registry backing store and hydration subscriptions.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::types::{Subscription, SubscriptionId};

/// Ordered set of listeners.
///
/// Registering the same `Arc` twice yields the existing registration.
/// Listeners are returned in registration order.
pub struct ListenerSet<L: ?Sized> {
    /// Active listeners by ID.
    listeners: RwLock<BTreeMap<SubscriptionId, Arc<L>>>,
    /// Counter for generating listener IDs.
    next_id: AtomicU64,
}

impl<L: ?Sized + Send + Sync + 'static> ListenerSet<L> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            listeners: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        })
    }

    /// Register a listener, returning a handle that removes it.
    pub fn subscribe(self: &Arc<Self>, listener: Arc<L>) -> Subscription {
        let id = {
            let mut listeners = self.listeners.write();
            let existing = listeners
                .iter()
                .find(|(_, l)| std::ptr::addr_eq(Arc::as_ptr(l), Arc::as_ptr(&listener)))
                .map(|(id, _)| *id);

            match existing {
                Some(id) => id,
                None => {
                    let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
                    listeners.insert(id, listener);
                    id
                }
            }
        };

        let registry = Arc::downgrade(self);
        Subscription::new(id, move || {
            if let Some(registry) = registry.upgrade() {
                registry.unsubscribe(id);
            }
        })
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.write().remove(&id).is_some()
    }

    /// Copy of the current listeners, in registration order.
    ///
    /// Notification passes iterate a snapshot so listeners can subscribe or
    /// unsubscribe while being notified.
    pub fn snapshot(&self) -> Vec<Arc<L>> {
        self.listeners.read().values().cloned().collect()
    }

    pub fn clear(&self) {
        self.listeners.write().clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }
}
