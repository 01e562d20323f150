//! Service configuration and per-call options.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Per-call options for mutating operations.
///
/// `tag` scopes both cleaning and validation; `persist` and `validate`
/// override it for one side only. Absent options mean "every field".
///
/// Unrecognised keys survive in `extra` and reach event subscribers untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate: Option<String>,
    /// Opaque state forwarded to validators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<Value>,
    /// Overrides the service-wide setting for this call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_tag_for_sub_schema: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OperationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope both cleaning and validation to `tag`.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Scope the persisted fields to `tag`, leaving validation scope alone.
    pub fn persist(mut self, tag: impl Into<String>) -> Self {
        self.persist = Some(tag.into());
        self
    }

    /// Scope validation to `tag`, leaving the persisted fields alone.
    pub fn validate(mut self, tag: impl Into<String>) -> Self {
        self.validate = Some(tag.into());
        self
    }

    pub fn set(mut self, state: Value) -> Self {
        self.set = Some(state);
        self
    }

    pub fn ignore_tag_for_sub_schema(mut self, ignore: bool) -> Self {
        self.ignore_tag_for_sub_schema = Some(ignore);
        self
    }

    /// Attach a caller-defined key that is forwarded to event subscribers.
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Tag used to select persisted fields: `persist`, else `tag`.
    pub fn persist_tag(&self) -> Option<&str> {
        self.persist.as_deref().or(self.tag.as_deref())
    }

    /// Tag used to select validated fields: `validate`, else `tag`.
    ///
    /// `persist` never narrows validation.
    pub fn validate_tag(&self) -> Option<&str> {
        self.validate.as_deref().or(self.tag.as_deref())
    }
}

/// Service-wide configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOptions {
    /// Defaults to the lower-cased name with spaces removed.
    #[serde(default)]
    pub slug: Option<String>,
    /// Defaults to the name with an `s` appended.
    #[serde(default)]
    pub plural: Option<String>,
    /// Keep nested-schema fields whole when projecting by tag.
    #[serde(default)]
    pub ignore_tag_for_sub_schema: bool,
}
