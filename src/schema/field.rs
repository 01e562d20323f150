use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::validators::Validator;
use super::{label_for, Schema};

/// The declared type of a field.
#[derive(Clone)]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    /// Free-form JSON object, never cast or projected.
    Object,
    /// Any JSON value, never cast.
    Any,
    /// A nested entity described by its own schema.
    Schema(Arc<dyn Schema>),
    /// A list whose elements share one type.
    Array(Box<FieldType>),
}

impl FieldType {
    /// Shorthand for `FieldType::Array(Box::new(inner))`.
    pub fn array(inner: FieldType) -> Self {
        FieldType::Array(Box::new(inner))
    }

    /// Shorthand for a nested schema field.
    pub fn schema<S: Schema + 'static>(schema: S) -> Self {
        FieldType::Schema(Arc::new(schema))
    }

    /// The nested schema, looking through arrays.
    pub fn sub_schema(&self) -> Option<&Arc<dyn Schema>> {
        match self {
            FieldType::Schema(schema) => Some(schema),
            FieldType::Array(inner) => inner.sub_schema(),
            _ => None,
        }
    }

    /// True for a nested schema or an array of one.
    pub fn is_sub_schema(&self) -> bool {
        self.sub_schema().is_some()
    }
}

impl fmt::Debug for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => write!(f, "String"),
            FieldType::Number => write!(f, "Number"),
            FieldType::Integer => write!(f, "Integer"),
            FieldType::Boolean => write!(f, "Boolean"),
            FieldType::Object => write!(f, "Object"),
            FieldType::Any => write!(f, "Any"),
            FieldType::Schema(schema) => write!(f, "Schema({})", schema.name()),
            FieldType::Array(inner) => write!(f, "Array({:?})", inner),
        }
    }
}

/// How a missing field is filled by `make_default`.
#[derive(Clone)]
pub enum DefaultValue {
    Value(Value),
    /// Evaluated on every call, e.g. for timestamps or generated codes.
    Generate(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    pub fn resolve(&self) -> Value {
        match self {
            DefaultValue::Value(value) => value.clone(),
            DefaultValue::Generate(generate) => generate(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Value(value) => f.debug_tuple("Value").field(value).finish(),
            DefaultValue::Generate(_) => write!(f, "Generate(..)"),
        }
    }
}

/// Declaration of a single field: type, tags, default rule and validators.
#[derive(Clone)]
pub struct FieldSpec {
    name: String,
    label: String,
    field_type: FieldType,
    tags: Vec<String>,
    default: Option<DefaultValue>,
    validators: Vec<Arc<dyn Validator>>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            label: label_for(&name),
            name,
            field_type,
            tags: Vec::new(),
            default: None,
            validators: Vec::new(),
        }
    }

    /// Override the label used in validation messages.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Add a tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add several tags.
    pub fn tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Use a fixed default value.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(DefaultValue::Value(value));
        self
    }

    /// Generate the default on every call.
    pub fn default_with<F>(mut self, generate: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Generate(Arc::new(generate)));
        self
    }

    /// Append a validator. Validators run in insertion order.
    pub fn validator<V: Validator + 'static>(mut self, validator: V) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_label(&self) -> &str {
        &self.label
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn tag_set(&self) -> &[String] {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn default_rule(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    pub fn validators(&self) -> &[Arc<dyn Validator>] {
        &self.validators
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("tags", &self.tags)
            .field("default", &self.default)
            .field("validators", &self.validators.len())
            .finish()
    }
}
