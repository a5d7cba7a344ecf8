//! Selector subscriptions: listen to a derived slice of the state.

use crate::store::StoreApi;
use crate::types::SharedState;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

use super::types::{EqualityFn, SelectorOptions, Subscription};

impl StoreApi {
    /// Subscribe to `selector(state)` instead of the whole state.
    ///
    /// The listener receives `(next, previous)` slices and only runs when the
    /// equality function reports a change against the last slice it was
    /// given. A panic in the selector or equality function unwinds into the
    /// caller of `set_state`.
    pub fn subscribe_with_selector<T, S, L>(
        &self,
        selector: S,
        listener: L,
        options: SelectorOptions<T>,
    ) -> Subscription
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        S: Fn(&Value) -> T + Send + Sync + 'static,
        L: Fn(&T, &T) + Send + Sync + 'static,
    {
        let equality: EqualityFn<T> = options
            .equality_fn
            .unwrap_or_else(|| Arc::new(|a: &T, b: &T| a == b));

        let initial = selector(&self.get_state());
        if options.fire_immediately {
            listener(&initial, &initial);
        }

        let current = Mutex::new(initial);
        self.subscribe(move |state: &SharedState, _previous: &SharedState| {
            let next = selector(state);
            let previous = {
                let mut current = current.lock();
                if equality(&current, &next) {
                    return;
                }
                std::mem::replace(&mut *current, next.clone())
            };
            listener(&next, &previous);
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::store::create_store_with;
    use crate::subscriptions::SelectorOptions;
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::sync::Arc;

    #[test]
    fn test_fire_immediately() {
        let api = create_store_with(json!({"value": 1}));
        let calls = Arc::new(Mutex::new(Vec::new()));
        let calls_clone = Arc::clone(&calls);

        let _sub = api.subscribe_with_selector(
            |s| s["value"].clone(),
            move |next: &Value, prev: &Value| calls_clone.lock().push((next.clone(), prev.clone())),
            SelectorOptions::default().fire_immediately(true),
        );

        assert_eq!(*calls.lock(), vec![(json!(1), json!(1))]);
    }

    #[test]
    fn test_independent_caches() {
        let api = create_store_with(json!({"a": 1, "b": 1}));
        let a_calls = Arc::new(Mutex::new(0));
        let b_calls = Arc::new(Mutex::new(0));

        let a = Arc::clone(&a_calls);
        let _sa = api.subscribe_with_selector(
            |s| s["a"].clone(),
            move |_: &Value, _: &Value| *a.lock() += 1,
            SelectorOptions::default(),
        );
        let b = Arc::clone(&b_calls);
        let _sb = api.subscribe_with_selector(
            |s| s["b"].clone(),
            move |_: &Value, _: &Value| *b.lock() += 1,
            SelectorOptions::default(),
        );

        api.set_state(json!({"a": 2}), false);
        api.set_state(json!({"b": 2}), false);
        api.set_state(json!({"a": 3}), false);

        assert_eq!(*a_calls.lock(), 2);
        assert_eq!(*b_calls.lock(), 1);
    }

    #[test]
    fn test_cache_advances_only_when_listener_fires() {
        let api = create_store_with(json!({"n": 0}));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        // Only report jumps of at least 2
        let _sub = api.subscribe_with_selector(
            |s| s["n"].as_i64().unwrap_or(0),
            move |next: &i64, prev: &i64| seen_clone.lock().push((*prev, *next)),
            SelectorOptions::default().equality_fn(|a: &i64, b: &i64| (a - b).abs() < 2),
        );

        api.set_state(json!({"n": 1}), false);
        api.set_state(json!({"n": 2}), false);
        api.set_state(json!({"n": 3}), false);

        assert_eq!(*seen.lock(), vec![(0, 2)]);
    }

    #[test]
    fn test_default_equality_compares_content() {
        let api = create_store_with(json!({"user": {"name": "ada"}}));
        let by_content = Arc::new(Mutex::new(0));
        let by_identity = Arc::new(Mutex::new(0));

        let calls = Arc::clone(&by_content);
        let _content = api.subscribe_with_selector(
            |s| Arc::new(s["user"].clone()),
            move |_: &Arc<Value>, _: &Arc<Value>| *calls.lock() += 1,
            SelectorOptions::default(),
        );
        let calls = Arc::clone(&by_identity);
        let _identity = api.subscribe_with_selector(
            |s| Arc::new(s["user"].clone()),
            move |_: &Arc<Value>, _: &Arc<Value>| *calls.lock() += 1,
            SelectorOptions::default().equality_fn(|a: &Arc<Value>, b: &Arc<Value>| Arc::ptr_eq(a, b)),
        );

        // Rebuilt slice, same content
        api.set_state(json!({"user": {"name": "ada"}}), false);

        assert_eq!(*by_content.lock(), 0);
        assert_eq!(*by_identity.lock(), 1);
    }

    #[test]
    #[should_panic(expected = "selector failed")]
    fn test_selector_panic_reaches_set_state_caller() {
        let api = create_store_with(json!({"n": 0}));
        let _sub = api.subscribe_with_selector(
            |s| {
                if s["n"] == 1 {
                    panic!("selector failed");
                }
                s["n"].clone()
            },
            |_: &Value, _: &Value| {},
            SelectorOptions::default(),
        );

        api.set_state(json!({"n": 1}), false);
    }
}
