//! Shallow structural equality and merge for JSON state.

use serde_json::Value;

/// Compare two values one level deep.
///
/// Objects are equal when they have the same key set and each pair of
/// values compares equal; arrays compare element-wise. Anything else falls
/// back to `==`.
pub fn shallow(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v))
        }
        (Value::Array(a), Value::Array(b)) => a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y),
        _ => a == b,
    }
}

/// Merge `overlay` over `base`, one level deep.
///
/// Returns `None` unless both values are objects.
pub fn shallow_merge(base: &Value, overlay: &Value) -> Option<Value> {
    let (Value::Object(base), Value::Object(overlay)) = (base, overlay) else {
        return None;
    };

    let mut merged = base.clone();
    for (key, value) in overlay {
        merged.insert(key.clone(), value.clone());
    }
    Some(Value::Object(merged))
}
