//! EntitySchema - declarative field list implementing the schema collaborator.

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Number, Value};

use super::validators::FieldContext;
use super::{FieldErrors, FieldSpec, FieldType, Schema, SchemaError};
use crate::entity::Entity;

/// A named, ordered list of [`FieldSpec`]s.
#[derive(Debug, Clone)]
pub struct EntitySchema {
    name: String,
    fields: Vec<FieldSpec>,
}

impl EntitySchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Declare a field. Returns `self` for chaining.
    ///
    /// Declaring a name twice replaces the earlier declaration in place.
    pub fn with_field(mut self, field: FieldSpec) -> Self {
        match self.fields.iter_mut().find(|f| f.name() == field.name()) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    /// Validate a nested value, reporting its failures under `prefix`.
    fn validate_nested<'a>(
        field_type: &'a FieldType,
        value: &'a Value,
        set: Option<&'a Value>,
        tag: Option<&'a str>,
        prefix: String,
    ) -> BoxFuture<'a, Result<FieldErrors, SchemaError>> {
        async move {
            let mut errors = FieldErrors::new();
            match (field_type, value) {
                (FieldType::Schema(schema), Value::Object(child)) => {
                    for (path, message) in schema.validate(child, set, tag).await? {
                        errors.insert(format!("{}.{}", prefix, path), message);
                    }
                }
                (FieldType::Array(inner), Value::Array(items)) if inner.is_sub_schema() => {
                    for (index, item) in items.iter().enumerate() {
                        let path = format!("{}.{}", prefix, index);
                        errors.extend(Self::validate_nested(inner, item, set, tag, path).await?);
                    }
                }
                _ => {}
            }
            Ok(errors)
        }
        .boxed()
    }
}

#[async_trait]
impl Schema for EntitySchema {
    fn name(&self) -> &str {
        &self.name
    }

    fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    fn make_default(&self, entity: &Entity) -> Entity {
        let mut out = Entity::new();
        for field in &self.fields {
            let value = match entity.get(field.name()) {
                Some(existing) => existing.clone(),
                None => match field.default_rule() {
                    Some(rule) => rule.resolve(),
                    None => default_for(field.field_type()),
                },
            };
            out.insert(field.name().to_string(), value);
        }
        out
    }

    fn cast(&self, entity: &Entity) -> Entity {
        let mut out = entity.clone();
        for field in &self.fields {
            if let Some(value) = out.get_mut(field.name()) {
                *value = self.cast_property(field.field_type(), value);
            }
        }
        out
    }

    fn cast_property(&self, field_type: &FieldType, value: &Value) -> Value {
        cast_value(field_type, value)
    }

    async fn validate(
        &self,
        entity: &Entity,
        set: Option<&Value>,
        tag: Option<&str>,
    ) -> Result<FieldErrors, SchemaError> {
        let mut errors = FieldErrors::new();

        for field in &self.fields {
            if let Some(tag) = tag {
                if !field.has_tag(tag) {
                    continue;
                }
            }

            let value = entity.get(field.name());
            let context = FieldContext {
                name: field.name(),
                label: field.display_label(),
                value,
                entity,
                set,
            };

            let mut failed = false;
            for validator in field.validators() {
                if let Some(message) = validator.validate(&context).await? {
                    errors.insert(field.name().to_string(), message);
                    failed = true;
                    break;
                }
            }

            if !failed {
                if let Some(value) = value {
                    let nested = Self::validate_nested(
                        field.field_type(),
                        value,
                        set,
                        tag,
                        field.name().to_string(),
                    )
                    .await?;
                    errors.extend(nested);
                }
            }
        }

        Ok(errors)
    }
}

fn default_for(field_type: &FieldType) -> Value {
    match field_type {
        FieldType::Array(_) => Value::Array(Vec::new()),
        FieldType::Schema(schema) => Value::Object(schema.make_default(&Entity::new())),
        _ => Value::Null,
    }
}

fn cast_value(field_type: &FieldType, value: &Value) -> Value {
    if value.is_null() {
        return Value::Null;
    }
    match field_type {
        FieldType::String => match value {
            Value::String(_) => value.clone(),
            Value::Number(n) => Value::String(n.to_string()),
            Value::Bool(b) => Value::String(b.to_string()),
            _ => value.clone(),
        },
        FieldType::Number => match value {
            Value::String(s) if s.trim().is_empty() => Value::Null,
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(normalise_number)
                .unwrap_or_else(|| value.clone()),
            Value::Bool(b) => Value::from(u8::from(*b)),
            _ => value.clone(),
        },
        FieldType::Integer => match value {
            Value::String(s) if s.trim().is_empty() => Value::Null,
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(|f| Value::from(f.trunc() as i64))
                .unwrap_or_else(|| value.clone()),
            Value::Number(n) => match n.as_i64() {
                Some(_) => value.clone(),
                None => n
                    .as_f64()
                    .map(|f| Value::from(f.trunc() as i64))
                    .unwrap_or_else(|| value.clone()),
            },
            Value::Bool(b) => Value::from(u8::from(*b)),
            _ => value.clone(),
        },
        FieldType::Boolean => match value {
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "" => Value::Null,
                "false" | "0" | "no" | "off" => Value::Bool(false),
                _ => Value::Bool(true),
            },
            Value::Number(n) => Value::Bool(n.as_f64().map(|f| f != 0.0).unwrap_or(true)),
            _ => value.clone(),
        },
        FieldType::Schema(schema) => match value {
            Value::Object(child) => Value::Object(schema.cast(child)),
            _ => value.clone(),
        },
        FieldType::Array(inner) => match value {
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| cast_value(inner, item)).collect())
            }
            _ => value.clone(),
        },
        FieldType::Object | FieldType::Any => value.clone(),
    }
}

/// Prefer integer representation when a parsed float has no fraction.
fn normalise_number(n: Number) -> Value {
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Value::from(f as i64),
        _ => Value::Number(n),
    }
}
