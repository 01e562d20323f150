//! Pre hooks - ordered processors registered per lifecycle phase.
//!
//! Each phase owns a [`HookChain`]. A chain threads the payload through its
//! processors one at a time, in registration order, and stops at the first
//! failure. An empty chain hands the payload back untouched.
//!
//! ## Example
//!
//! ```ignore
//! service.pre(Phase::Create, |mut contact: Entity| async move {
//!     contact.insert("createdAt".into(), json!(now()));
//!     Ok(contact)
//! });
//! ```

use std::error::Error;
use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::entity::Entity;

/// Pipeline insertion points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    CreateValidate,
    Create,
    UpdateValidate,
    Update,
    PartialValidate,
    PartialUpdate,
    Delete,
}

impl Phase {
    pub const ALL: [Phase; 7] = [
        Phase::CreateValidate,
        Phase::Create,
        Phase::UpdateValidate,
        Phase::Update,
        Phase::PartialValidate,
        Phase::PartialUpdate,
        Phase::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::CreateValidate => "createValidate",
            Phase::Create => "create",
            Phase::UpdateValidate => "updateValidate",
            Phase::Update => "update",
            Phase::PartialValidate => "partialValidate",
            Phase::PartialUpdate => "partialUpdate",
            Phase::Delete => "delete",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by a processor to halt its chain.
#[derive(Debug)]
pub enum HookError {
    /// The processor refused the payload.
    Rejected(String),
    /// Anything else the processor ran into.
    Other(Box<dyn Error + Send + Sync>),
}

impl HookError {
    pub fn rejected(message: impl Into<String>) -> Self {
        HookError::Rejected(message.into())
    }

    pub fn other<E: Error + Send + Sync + 'static>(err: E) -> Self {
        HookError::Other(Box::new(err))
    }
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookError::Rejected(message) => write!(f, "rejected: {}", message),
            HookError::Other(e) => write!(f, "hook error: {}", e),
        }
    }
}

impl Error for HookError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            HookError::Other(e) => Some(e.as_ref()),
            HookError::Rejected(_) => None,
        }
    }
}

/// A chain halted: the processor's error plus the payload it was handed.
#[derive(Debug)]
pub struct ChainFailure {
    pub error: HookError,
    pub payload: Entity,
}

/// A single pre-processing step.
///
/// Closures `Fn(Entity) -> impl Future<Output = Result<Entity, HookError>>`
/// implement this directly.
#[async_trait]
pub trait Processor: Send + Sync {
    async fn process(&self, payload: Entity) -> Result<Entity, HookError>;
}

#[async_trait]
impl<F, Fut> Processor for F
where
    F: Fn(Entity) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Entity, HookError>> + Send + 'static,
{
    async fn process(&self, payload: Entity) -> Result<Entity, HookError> {
        (self)(payload).await
    }
}

/// Ordered, append-only list of processors for one phase.
#[derive(Default)]
pub struct HookChain {
    processors: Vec<Box<dyn Processor>>,
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a processor and return the new chain length.
    pub fn push<P: Processor + 'static>(&mut self, processor: P) -> usize {
        self.processors.push(Box::new(processor));
        self.processors.len()
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Run every processor in order, feeding each one the previous output.
    pub async fn run(&self, payload: Entity) -> Result<Entity, ChainFailure> {
        let mut payload = payload;
        for processor in &self.processors {
            let handed = payload.clone();
            match processor.process(payload).await {
                Ok(next) => payload = next,
                Err(error) => {
                    return Err(ChainFailure {
                        error,
                        payload: handed,
                    })
                }
            }
        }
        Ok(payload)
    }
}

impl fmt::Debug for HookChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookChain")
            .field("processors", &self.processors.len())
            .finish()
    }
}

/// One chain per [`Phase`].
#[derive(Debug, Default)]
pub struct HookRegistry {
    create_validate: HookChain,
    create: HookChain,
    update_validate: HookChain,
    update: HookChain,
    partial_validate: HookChain,
    partial_update: HookChain,
    delete: HookChain,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chain(&self, phase: Phase) -> &HookChain {
        match phase {
            Phase::CreateValidate => &self.create_validate,
            Phase::Create => &self.create,
            Phase::UpdateValidate => &self.update_validate,
            Phase::Update => &self.update,
            Phase::PartialValidate => &self.partial_validate,
            Phase::PartialUpdate => &self.partial_update,
            Phase::Delete => &self.delete,
        }
    }

    fn chain_mut(&mut self, phase: Phase) -> &mut HookChain {
        match phase {
            Phase::CreateValidate => &mut self.create_validate,
            Phase::Create => &mut self.create,
            Phase::UpdateValidate => &mut self.update_validate,
            Phase::Update => &mut self.update,
            Phase::PartialValidate => &mut self.partial_validate,
            Phase::PartialUpdate => &mut self.partial_update,
            Phase::Delete => &mut self.delete,
        }
    }

    /// Append `processor` to `phase` and return that chain's new length.
    pub fn pre<P: Processor + 'static>(&mut self, phase: Phase, processor: P) -> usize {
        self.chain_mut(phase).push(processor)
    }

    pub async fn run(&self, phase: Phase, payload: Entity) -> Result<Entity, ChainFailure> {
        let chain = self.chain(phase);
        tracing::trace!(phase = %phase, processors = chain.len(), "running pre hooks");
        chain.run(payload).await
    }
}
