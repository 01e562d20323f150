//! Change notifications.
//!
//! Every completed mutation publishes one [`ServiceEvent`] on the service's
//! [`EventNotifier`]. Handlers run synchronously, in subscription order,
//! after the store acknowledged the write and before the operation returns.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LockResult, PoisonError, RwLock};

use serde::Serialize;
use serde_json::Value;

use crate::entity::{Entity, Query};
use crate::options::OperationOptions;

/// Names of the published events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Create,
    Update,
    PartialUpdate,
    Delete,
    DeleteMany,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Create,
        EventKind::Update,
        EventKind::PartialUpdate,
        EventKind::Delete,
        EventKind::DeleteMany,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Create => "create",
            EventKind::Update => "update",
            EventKind::PartialUpdate => "partialUpdate",
            EventKind::Delete => "delete",
            EventKind::DeleteMany => "deleteMany",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a published event.
///
/// Entities are the store's view of the record, before output stripping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ServiceEvent {
    Create {
        entity: Entity,
        options: OperationOptions,
    },
    Update {
        entity: Option<Entity>,
        options: OperationOptions,
    },
    PartialUpdate {
        entity: Option<Entity>,
        original: Entity,
        options: OperationOptions,
    },
    Delete {
        id: Value,
        options: OperationOptions,
    },
    DeleteMany {
        query: Query,
    },
}

impl ServiceEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ServiceEvent::Create { .. } => EventKind::Create,
            ServiceEvent::Update { .. } => EventKind::Update,
            ServiceEvent::PartialUpdate { .. } => EventKind::PartialUpdate,
            ServiceEvent::Delete { .. } => EventKind::Delete,
            ServiceEvent::DeleteMany { .. } => EventKind::DeleteMany,
        }
    }

    /// The saved entity, for create and update events.
    pub fn entity(&self) -> Option<&Entity> {
        match self {
            ServiceEvent::Create { entity, .. } => Some(entity),
            ServiceEvent::Update { entity, .. } | ServiceEvent::PartialUpdate { entity, .. } => {
                entity.as_ref()
            }
            _ => None,
        }
    }

    /// The caller's options, where the event carries them.
    pub fn options(&self) -> Option<&OperationOptions> {
        match self {
            ServiceEvent::Create { options, .. }
            | ServiceEvent::Update { options, .. }
            | ServiceEvent::PartialUpdate { options, .. }
            | ServiceEvent::Delete { options, .. } => Some(options),
            ServiceEvent::DeleteMany { .. } => None,
        }
    }
}

type Handler = Arc<dyn Fn(&ServiceEvent) + Send + Sync>;

/// Per-service publish point.
#[derive(Clone, Default)]
pub struct EventNotifier {
    listeners: Arc<RwLock<HashMap<EventKind, Vec<Handler>>>>,
}

impl EventNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one kind of event.
    pub fn on<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&ServiceEvent) + Send + Sync + 'static,
    {
        self.subscribe(kind, Arc::new(handler));
    }

    /// Subscribe to every kind of event.
    pub fn on_any<F>(&self, handler: F)
    where
        F: Fn(&ServiceEvent) + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(handler);
        for kind in EventKind::ALL {
            self.subscribe(kind, Arc::clone(&handler));
        }
    }

    fn subscribe(&self, kind: EventKind, handler: Handler) {
        let mut listeners = recover(self.listeners.write());
        listeners.entry(kind).or_default().push(handler);
    }

    /// Deliver `event` to its subscribers, in subscription order.
    pub fn emit(&self, event: &ServiceEvent) {
        let handlers: Vec<Handler> = {
            let listeners = recover(self.listeners.read());
            listeners.get(&event.kind()).cloned().unwrap_or_default()
        };
        tracing::trace!(event = %event.kind(), subscribers = handlers.len(), "emitting");
        for handler in handlers {
            handler(event);
        }
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        recover(self.listeners.read())
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Re-publish every event as JSON on an `event_emitter_rs` emitter.
    ///
    /// The emitter delivers on its own threads, so these listeners are not
    /// ordered with respect to the operation's completion.
    #[cfg(feature = "emitter")]
    pub fn forward_to(&self, emitter: event_emitter_rs::EventEmitter) {
        let emitter = std::sync::Mutex::new(emitter);
        self.on_any(move |event| {
            let payload = match serde_json::to_string(event) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(event = %event.kind(), error = %e, "could not encode event");
                    return;
                }
            };
            recover(emitter.lock()).emit(event.kind().as_str(), payload);
        });
    }
}

/// A poisoned lock only means some handler panicked while holding it; the
/// guarded data is still usable.
fn recover<T>(result: LockResult<T>) -> T {
    result.unwrap_or_else(PoisonError::into_inner)
}

impl fmt::Debug for EventNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: Vec<(EventKind, usize)> = EventKind::ALL
            .iter()
            .map(|kind| (*kind, self.listener_count(*kind)))
            .collect();
        f.debug_struct("EventNotifier").field("listeners", &counts).finish()
    }
}
