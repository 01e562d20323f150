//! Store - abstract persistence for entities.
//!
//! A store owns the identifier field and its type, and exposes CRUD plus
//! query operations. The service never assumes anything about how records
//! are kept; the bundled [`InMemoryStore`] is a HashMap-backed implementation
//! for tests and development.
//!
//! ## Naming Conventions
//!
//! - `read` - a single record, `Ok(None)` when missing
//! - `update` - merge the given keys into an existing record, `Ok(None)` when missing
//! - `find` - buffered list; `find_stream` - lazy, single-pass stream

mod in_memory;

use std::fmt;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::{Entity, Query};

pub use in_memory::InMemoryStore;

/// Lazy, single-pass sequence of records.
pub type EntityStream = BoxStream<'static, Result<Entity, StoreError>>;

/// Declared type of the identifier field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdType {
    #[default]
    String,
    Number,
}

/// Paging for `find`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindOptions {
    #[serde(default)]
    pub skip: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Error type for store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    LockPoisoned(&'static str),
    /// A write needed an identifier and none was given.
    MissingId { id_property: String },
    /// `create` collided with an existing record.
    Duplicate { id: String },
    /// Backend-specific failure.
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::LockPoisoned(operation) => {
                write!(f, "store lock poisoned during {}", operation)
            }
            StoreError::MissingId { id_property } => {
                write!(f, "object has no '{}' to address", id_property)
            }
            StoreError::Duplicate { id } => write!(f, "object with id {} already exists", id),
            StoreError::Backend(message) => write!(f, "backend error: {}", message),
        }
    }
}

impl std::error::Error for StoreError {}

/// The storage collaborator.
#[async_trait]
pub trait Store: Send + Sync {
    /// Name of the identifier field (e.g. `"_id"`).
    fn id_property(&self) -> &str;

    fn id_type(&self) -> IdType;

    /// Persist a new record, assigning an identifier when it has none.
    async fn create(&self, entity: Entity) -> Result<Entity, StoreError>;

    async fn read(&self, id: &Value) -> Result<Option<Entity>, StoreError>;

    /// Merge `entity` into the record it identifies. `Ok(None)` when there is none.
    async fn update(&self, entity: Entity) -> Result<Option<Entity>, StoreError>;

    /// Remove a record. Missing records are not an error.
    async fn delete(&self, id: &Value) -> Result<(), StoreError>;

    async fn delete_many(&self, query: &Query) -> Result<(), StoreError>;

    async fn find(&self, query: &Query, options: FindOptions) -> Result<Vec<Entity>, StoreError>;

    /// Stream matching records instead of buffering them.
    fn find_stream(&self, query: &Query, options: FindOptions) -> EntityStream;

    async fn count(&self, query: &Query) -> Result<usize, StoreError>;
}
