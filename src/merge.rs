//! Partial-update merge.
//!
//! A patch is validated against the stored record overlaid with the patch, so
//! cross-field rules and required fields see a complete entity. Only the keys
//! the caller actually sent are written back.

use crate::entity::Entity;

/// Copy of `stored` with every key of `patch` laid over it. Patch wins.
pub fn overlay(stored: &Entity, patch: &Entity) -> Entity {
    let mut merged = stored.clone();
    for (key, value) in patch {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Limit `validated` to the keys of `patch`, taking the validated values.
///
/// Keys the cleaning stage removed stay removed. The identifier is always
/// kept so the store can address the record.
pub fn restrict_to_patch(patch: &Entity, validated: &Entity, id_property: &str) -> Entity {
    let mut out = Entity::new();
    for key in patch.keys() {
        if let Some(value) = validated.get(key) {
            out.insert(key.clone(), value.clone());
        }
    }
    if !out.contains_key(id_property) {
        if let Some(id) = validated.get(id_property).or_else(|| patch.get(id_property)) {
            out.insert(id_property.to_string(), id.clone());
        }
    }
    out
}
