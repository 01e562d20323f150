mod entity;
mod error;
mod events;
mod hooks;
mod merge;
mod options;
mod projection;
pub mod schema;
mod service;
pub mod store;
mod validation;

#[cfg(feature = "http")]
pub mod http;

pub use entity::{id_to_string, is_present, Entity, Query};
pub use error::{ServiceError, ValidationError};
pub use events::{EventKind, EventNotifier, ServiceEvent};
pub use hooks::{ChainFailure, HookChain, HookError, HookRegistry, Phase, Processor};
pub use merge::{overlay, restrict_to_patch};
pub use options::{OperationOptions, ServiceOptions};
pub use projection::project;
pub use schema::validators;
pub use schema::{
    DefaultValue, EntitySchema, FieldErrors, FieldSpec, FieldType, Schema, SchemaError,
};
pub use service::{CrudService, ServiceStream};
pub use store::{EntityStream, FindOptions, IdType, InMemoryStore, Store, StoreError};
pub use validation::gate;

// Re-export the EventEmitter from the event_emitter_rs crate
#[cfg(feature = "emitter")]
pub use event_emitter_rs::EventEmitter;
