//! Entity - the dynamic record shape that flows through every operation.

use serde_json::{Map, Value};

/// A record keyed by field name.
///
/// The shape is constrained by a [`Schema`](crate::Schema) but never enforced
/// by the type itself: callers and stores may hand over arbitrary keys, which
/// the service strips before anything is persisted or returned.
pub type Entity = Map<String, Value>;

/// Field-equality filter passed through to a store's `find`, `count` and
/// `delete_many`. An empty query matches every record.
pub type Query = Map<String, Value>;

/// Returns true when `value` counts as a supplied identifier.
///
/// `null` and the empty string are treated as absent.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Render an identifier the way it appears in messages and store keys.
///
/// Strings are rendered without quotes so `"42"` and `42` share a key.
pub fn id_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Returns true when every key in `query` is present in `entity` with an equal value.
pub fn matches(entity: &Entity, query: &Query) -> bool {
    query
        .iter()
        .all(|(key, expected)| entity.get(key) == Some(expected))
}
