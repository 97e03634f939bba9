//! Tree operations on the save document
//!
//! Deep merge for default backfill and dotted-path access
//! (`"settings.master_volume"`).

use serde_json::{Map, Value};

/// Recursively merge `overrides` onto `base`, returning the result.
///
/// Where both sides hold an object under the same key the objects are merged
/// key by key; otherwise the override value wins. Keys present on only one
/// side are carried through unchanged.
pub fn deep_merge(base: Value, overrides: Value) -> Value {
    match (base, overrides) {
        (Value::Object(mut base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                let merged = match base.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        (_, overrides) => overrides,
    }
}

/// Look up a dotted path. `None` if any segment is missing or an
/// intermediate value is not an object.
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(root, |node, segment| node.as_object()?.get(segment))
}

/// Store `value` at a dotted path, creating intermediate objects.
///
/// Intermediate values that are not objects are replaced. Returns `false`
/// (and leaves the tree untouched) for an empty path or a non-object root.
pub fn set_path(root: &mut Value, path: &str, value: Value) -> bool {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return false;
    }
    let Some((last, parents)) = segments.split_last() else {
        return false;
    };
    let Some(mut node) = root.as_object_mut() else {
        return false;
    };
    for segment in parents {
        let child = node
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !child.is_object() {
            *child = Value::Object(Map::new());
        }
        node = match child.as_object_mut() {
            Some(map) => map,
            None => return false,
        };
    }
    node.insert(last.to_string(), value);
    true
}

/// Remove the value at a dotted path, returning it
pub fn take_path(root: &mut Value, path: &str) -> Option<Value> {
    let (parent, last) = match path.rsplit_once('.') {
        Some((parent, last)) => (parent, last),
        None => return root.as_object_mut()?.remove(path),
    };
    let mut node = root;
    for segment in parent.split('.') {
        node = node.as_object_mut()?.get_mut(segment)?;
    }
    node.as_object_mut()?.remove(last)
}
