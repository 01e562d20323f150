use std::error::Error;
use std::fmt;

use crate::entity::Entity;
use crate::hooks::{ChainFailure, HookError, Phase};
use crate::schema::{FieldErrors, SchemaError};
use crate::store::StoreError;

/// Field-level validation failure.
///
/// Carries every failing field and the payload as it stood when validated.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub errors: FieldErrors,
    pub payload: Entity,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation Error")
    }
}

impl Error for ValidationError {}

/// Error type for service operations.
#[derive(Debug)]
pub enum ServiceError {
    /// The service was wired against an incompatible schema/store pair.
    Configuration(String),
    /// `partial_update` was called without an identifier.
    MissingId { id_property: String },
    /// `partial_update` targeted an identifier with no stored record.
    NotFound { id_property: String, id: String },
    /// A pre hook halted its chain.
    Hook {
        phase: Phase,
        error: HookError,
        payload: Entity,
    },
    Store(StoreError),
    Schema(SchemaError),
    Validation(ValidationError),
}

impl ServiceError {
    pub(crate) fn hook(phase: Phase, failure: ChainFailure) -> Self {
        ServiceError::Hook {
            phase,
            error: failure.error,
            payload: failure.payload,
        }
    }

    /// Field errors when this is a validation failure.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ServiceError::Validation(e) => Some(&e.errors),
            _ => None,
        }
    }

    /// The in-flight payload, for validation and hook failures.
    pub fn payload(&self) -> Option<&Entity> {
        match self {
            ServiceError::Validation(e) => Some(&e.payload),
            ServiceError::Hook { payload, .. } => Some(payload),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ServiceError::Validation(_))
    }

    /// Map this error to an HTTP-style status code.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Configuration(_) => 500,
            ServiceError::MissingId { .. } => 400,
            ServiceError::NotFound { .. } => 404,
            ServiceError::Hook {
                error: HookError::Rejected(_),
                ..
            } => 422,
            ServiceError::Hook { .. } => 500,
            ServiceError::Store(_) => 500,
            ServiceError::Schema(_) => 500,
            ServiceError::Validation(_) => 400,
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Configuration(message) => write!(f, "{}", message),
            ServiceError::MissingId { id_property } => {
                write!(f, "object has no ID property '{}'", id_property)
            }
            ServiceError::NotFound { id_property, id } => {
                write!(f, "Couldn't find object with an {} of {}", id_property, id)
            }
            ServiceError::Hook { phase, error, .. } => {
                write!(f, "{} hook failed: {}", phase, error)
            }
            ServiceError::Store(e) => write!(f, "store error: {}", e),
            ServiceError::Schema(e) => write!(f, "{}", e),
            ServiceError::Validation(e) => write!(f, "{}", e),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ServiceError::Hook { error, .. } => Some(error),
            ServiceError::Store(e) => Some(e),
            ServiceError::Schema(e) => Some(e),
            ServiceError::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        ServiceError::Store(err)
    }
}

impl From<SchemaError> for ServiceError {
    fn from(err: SchemaError) -> Self {
        ServiceError::Schema(err)
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Validation(err)
    }
}
