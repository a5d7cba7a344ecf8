//! Property tests for merge, equality and notification semantics.

use proptest::prelude::*;
use serde_json::{Map, Value};
use statecraft::{create_store_with, shallow, shallow_merge, SelectorOptions};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn flat_object() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-f]", -5i64..5, 0..6).prop_map(to_object)
}

fn to_object(entries: BTreeMap<String, i64>) -> Value {
    Value::Object(
        entries
            .into_iter()
            .map(|(k, v)| (k, Value::from(v)))
            .collect::<Map<String, Value>>(),
    )
}

proptest! {
    #[test]
    fn merge_keeps_base_keys_and_overlay_wins(base in flat_object(), overlay in flat_object()) {
        let merged = shallow_merge(&base, &overlay).unwrap();
        let merged = merged.as_object().unwrap();

        for (key, value) in overlay.as_object().unwrap() {
            prop_assert_eq!(merged.get(key), Some(value));
        }
        for (key, value) in base.as_object().unwrap() {
            if !overlay.as_object().unwrap().contains_key(key) {
                prop_assert_eq!(merged.get(key), Some(value));
            }
        }
    }

    #[test]
    fn merge_with_empty_overlay_is_identity(base in flat_object()) {
        let merged = shallow_merge(&base, &Value::Object(Map::new())).unwrap();
        prop_assert_eq!(merged, base);
    }

    #[test]
    fn shallow_agrees_with_eq_on_flat_objects(a in flat_object(), b in flat_object()) {
        prop_assert!(shallow(&a, &a));
        prop_assert_eq!(shallow(&a, &b), a == b);
        prop_assert_eq!(shallow(&a, &b), shallow(&b, &a));
    }

    #[test]
    fn store_state_is_fold_of_merges(initial in flat_object(), overlays in prop::collection::vec(flat_object(), 0..8)) {
        let api = create_store_with(initial.clone());
        let mut expected = initial;

        for overlay in overlays {
            api.set_state(overlay.clone(), false);
            expected = shallow_merge(&expected, &overlay).unwrap();
        }

        prop_assert_eq!(&*api.get_state(), &expected);
    }

    #[test]
    fn selector_fires_once_per_slice_change(overlays in prop::collection::vec(flat_object(), 0..8)) {
        let api = create_store_with(serde_json::json!({"a": 0}));
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let _sub = api.subscribe_with_selector(
            |s: &Value| s.get("a").cloned(),
            move |_: &Option<Value>, _: &Option<Value>| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            },
            SelectorOptions::default(),
        );

        let mut last = api.get_state().get("a").cloned();
        let mut changes = 0;
        for overlay in overlays {
            api.set_state(overlay, false);
            let now = api.get_state().get("a").cloned();
            if now != last {
                changes += 1;
                last = now;
            }
        }

        prop_assert_eq!(calls.load(Ordering::SeqCst), changes);
    }
}
