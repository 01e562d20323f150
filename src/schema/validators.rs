//! Field validators.
//!
//! A validator inspects one field in the context of the whole entity and
//! returns `Ok(Some(message))` to fail it, `Ok(None)` to pass it, or `Err` when
//! it cannot decide at all.

use async_trait::async_trait;
use serde_json::Value;

use super::SchemaError;
use crate::entity::Entity;

/// Everything a validator may look at.
#[derive(Debug, Clone, Copy)]
pub struct FieldContext<'a> {
    pub name: &'a str,
    pub label: &'a str,
    pub value: Option<&'a Value>,
    pub entity: &'a Entity,
    /// Opaque caller state from `OperationOptions::set`.
    pub set: Option<&'a Value>,
}

impl FieldContext<'_> {
    /// True when the value is absent, `null` or an empty string.
    pub fn is_blank(&self) -> bool {
        match self.value {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        }
    }
}

#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, field: &FieldContext<'_>) -> Result<Option<String>, SchemaError>;
}

/// Fails blank values with `"<Label> is required"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Required;

#[async_trait]
impl Validator for Required {
    async fn validate(&self, field: &FieldContext<'_>) -> Result<Option<String>, SchemaError> {
        if field.is_blank() {
            return Ok(Some(format!("{} is required", field.label)));
        }
        Ok(None)
    }
}

pub fn required() -> Required {
    Required
}

/// Bounds the character length of strings and the element count of arrays.
///
/// Blank values pass; combine with [`Required`] to reject them.
#[derive(Debug, Clone, Copy)]
pub struct Length {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

#[async_trait]
impl Validator for Length {
    async fn validate(&self, field: &FieldContext<'_>) -> Result<Option<String>, SchemaError> {
        let len = match field.value {
            Some(Value::String(s)) if !s.is_empty() => s.chars().count(),
            Some(Value::Array(items)) => items.len(),
            _ => return Ok(None),
        };
        match (self.min, self.max) {
            (Some(min), Some(max)) if len < min || len > max => Ok(Some(format!(
                "{} must be between {} and {} in length",
                field.label, min, max
            ))),
            (Some(min), None) if len < min => Ok(Some(format!(
                "{} must be at least {} in length",
                field.label, min
            ))),
            (None, Some(max)) if len > max => Ok(Some(format!(
                "{} must be no more than {} in length",
                field.label, max
            ))),
            _ => Ok(None),
        }
    }
}

pub fn length(min: Option<usize>, max: Option<usize>) -> Length {
    Length { min, max }
}

/// Restricts a value to a fixed list.
#[derive(Debug, Clone)]
pub struct OneOf {
    allowed: Vec<Value>,
}

#[async_trait]
impl Validator for OneOf {
    async fn validate(&self, field: &FieldContext<'_>) -> Result<Option<String>, SchemaError> {
        match field.value {
            None | Some(Value::Null) => Ok(None),
            Some(value) if self.allowed.contains(value) => Ok(None),
            Some(_) => {
                let allowed: Vec<String> = self
                    .allowed
                    .iter()
                    .map(crate::entity::id_to_string)
                    .collect();
                Ok(Some(format!(
                    "{} must be one of: {}",
                    field.label,
                    allowed.join(", ")
                )))
            }
        }
    }
}

pub fn one_of<I: IntoIterator<Item = Value>>(allowed: I) -> OneOf {
    OneOf {
        allowed: allowed.into_iter().collect(),
    }
}

/// Adapter for synchronous closures.
pub struct FnValidator<F>(F);

#[async_trait]
impl<F> Validator for FnValidator<F>
where
    F: Fn(&FieldContext<'_>) -> Option<String> + Send + Sync,
{
    async fn validate(&self, field: &FieldContext<'_>) -> Result<Option<String>, SchemaError> {
        Ok((self.0)(field))
    }
}

/// Wrap a closure as a validator.
pub fn validator_fn<F>(check: F) -> FnValidator<F>
where
    F: Fn(&FieldContext<'_>) -> Option<String> + Send + Sync,
{
    FnValidator(check)
}
