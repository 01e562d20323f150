//! Schema - the field model every operation is cleaned and validated against.
//!
//! The service only talks to a schema through the [`Schema`] trait. Field
//! typing, default generation, casting and rule evaluation live behind it;
//! the service owns the order in which they are applied.
//!
//! [`EntitySchema`] is the bundled implementation:
//!
//! ```ignore
//! use crud_service::{EntitySchema, FieldSpec, FieldType, validators};
//!
//! let contact = EntitySchema::new("Contact")
//!     .with_field(FieldSpec::new("_id", FieldType::String).tags(["a", "b"]))
//!     .with_field(FieldSpec::new("name", FieldType::String).tag("a").validator(validators::required()))
//!     .with_field(FieldSpec::new("email", FieldType::String).tag("b").validator(validators::required()));
//! ```

mod entity_schema;
mod field;
pub mod validators;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::entity::Entity;
use crate::projection;

pub use entity_schema::EntitySchema;
pub use field::{DefaultValue, FieldSpec, FieldType};
pub use validators::{FieldContext, Validator};

/// Field name (or dotted path for nested schemas) to human-readable message.
///
/// An empty map means validation passed.
pub type FieldErrors = BTreeMap<String, String>;

/// Infrastructure failure raised while a schema evaluates its rules.
///
/// Field-level rule violations are not errors; they are reported through
/// [`FieldErrors`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A validator could not reach a verdict (lookup failed, remote rule unavailable, ...).
    Validator { field: String, message: String },
    /// Any other schema-level failure.
    Other(String),
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::Validator { field, message } => {
                write!(f, "validator for '{}' failed: {}", field, message)
            }
            SchemaError::Other(message) => write!(f, "schema error: {}", message),
        }
    }
}

impl std::error::Error for SchemaError {}

/// The schema collaborator.
#[async_trait]
pub trait Schema: Send + Sync {
    /// Human-readable schema name (e.g. "Contact").
    fn name(&self) -> &str;

    /// Declared fields, in declaration order.
    fn fields(&self) -> &[FieldSpec];

    /// Look up a declared field by name.
    fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields().iter().find(|f| f.name() == name)
    }

    /// Fill every declared field the entity lacks with its default.
    fn make_default(&self, entity: &Entity) -> Entity;

    /// Drop undeclared fields and, when `tag` is given, fields not carrying it.
    ///
    /// The default implementation is the crate's tag projector.
    fn strip_unknown_properties(
        &self,
        entity: &Entity,
        tag: Option<&str>,
        ignore_tag_for_sub_schema: bool,
    ) -> Entity {
        projection::project(self.fields(), entity, tag, ignore_tag_for_sub_schema)
    }

    /// Coerce every declared field present in `entity` to its declared type.
    fn cast(&self, entity: &Entity) -> Entity;

    /// Coerce a single value to `field_type`.
    fn cast_property(&self, field_type: &FieldType, value: &Value) -> Value;

    /// Evaluate field rules for fields carrying `tag` (all fields when `None`).
    ///
    /// `set` is opaque caller state handed to every validator. Every failing
    /// field is reported; evaluation never stops at the first failure.
    async fn validate(
        &self,
        entity: &Entity,
        set: Option<&Value>,
        tag: Option<&str>,
    ) -> Result<FieldErrors, SchemaError>;
}

/// Turn a field name into a label: `email` -> `Email`, `mobileNumber` -> `Mobile Number`.
pub fn label_for(name: &str) -> String {
    let mut label = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.trim_start_matches('_').chars() {
        if c == '_' || c == '-' {
            if !label.ends_with(' ') && !label.is_empty() {
                label.push(' ');
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower {
            label.push(' ');
        }
        if label.is_empty() || label.ends_with(' ') {
            label.extend(c.to_uppercase());
        } else {
            label.push(c);
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
    }
    label
}
