//! Validation gate - runs schema rules and halts the pipeline on failure.

use serde_json::Value;

use crate::entity::Entity;
use crate::error::{ServiceError, ValidationError};
use crate::schema::Schema;

/// Validate `entity` under `tag` and hand it back when every rule passes.
///
/// All failing fields are collected into one [`ValidationError`] that also
/// carries the entity. Schema infrastructure errors pass through as-is.
pub async fn gate<S: Schema + ?Sized>(
    schema: &S,
    entity: Entity,
    set: Option<&Value>,
    tag: Option<&str>,
) -> Result<Entity, ServiceError> {
    let errors = schema.validate(&entity, set, tag).await?;
    if errors.is_empty() {
        return Ok(entity);
    }
    tracing::debug!(
        schema = schema.name(),
        fields = ?errors.keys().collect::<Vec<_>>(),
        "validation failed"
    );
    Err(ValidationError {
        errors,
        payload: entity,
    }
    .into())
}
