//! Subscription handles and selector options.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Unique identifier for a registered listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle returned by every `subscribe`-style call.
///
/// Dropping the handle does not unsubscribe.
pub struct Subscription {
    id: SubscriptionId,
    remove: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, remove: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id,
            remove: Mutex::new(Some(Box::new(remove))),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Deregister the listener. Repeat calls do nothing.
    pub fn unsubscribe(&self) {
        let remove = self.remove.lock().take();
        if let Some(remove) = remove {
            remove();
        }
    }

    pub fn is_active(&self) -> bool {
        self.remove.lock().is_some()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Decides whether two selected slices count as the same.
pub type EqualityFn<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// Options for a selector subscription.
pub struct SelectorOptions<T> {
    /// Defaults to `PartialEq`, which compares slices by content.
    ///
    /// A freshly built slice equal to the previous one does not fire the
    /// listener. Supply a comparator to observe identity changes instead.
    pub equality_fn: Option<EqualityFn<T>>,

    /// Call the listener once at subscribe time with `(selected, selected)`.
    pub fire_immediately: bool,
}

impl<T> SelectorOptions<T> {
    /// Replace the default content comparison.
    pub fn equality_fn(mut self, f: impl Fn(&T, &T) -> bool + Send + Sync + 'static) -> Self {
        self.equality_fn = Some(Arc::new(f));
        self
    }

    pub fn fire_immediately(mut self, fire: bool) -> Self {
        self.fire_immediately = fire;
        self
    }
}

impl<T> Default for SelectorOptions<T> {
    fn default() -> Self {
        Self {
            equality_fn: None,
            fire_immediately: false,
        }
    }
}
