//! CrudService - the operation controller.
//!
//! `CrudService<S, T>` pairs a [`Schema`] with a [`Store`] and runs every
//! mutation through the same pipeline:
//!
//! ```text
//! default-fill -> strip/project -> cast -> <phase>Validate hooks -> validation
//!     -> <phase> hooks -> strip -> store -> event -> strip(output)
//! ```
//!
//! Hooks are registered with [`CrudService::pre`] while the service is still
//! owned; wrap it in an `Arc` once configured.
//!
//! ## Example
//!
//! ```ignore
//! use crud_service::{CrudService, InMemoryStore, OperationOptions, Phase};
//!
//! let mut contacts = CrudService::new("Contact", contact_schema(), InMemoryStore::new())?;
//! contacts.pre(Phase::Create, |mut contact: Entity| async move {
//!     contact.insert("name".into(), json!("Paul"));
//!     Ok(contact)
//! });
//!
//! let saved = contacts.create(new_contact, OperationOptions::new().tag("a")).await?;
//! ```

use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt};
use serde_json::Value;

use crate::entity::{id_to_string, is_present, Entity, Query};
use crate::error::ServiceError;
use crate::events::{EventKind, EventNotifier, ServiceEvent};
use crate::hooks::{HookRegistry, Phase, Processor};
use crate::merge::{overlay, restrict_to_patch};
use crate::options::{OperationOptions, ServiceOptions};
use crate::schema::Schema;
use crate::store::{FindOptions, IdType, Store};
use crate::validation::gate;

/// Lazy, single-pass sequence of stripped entities from [`CrudService::find_all`].
pub type ServiceStream = BoxStream<'static, Result<Entity, ServiceError>>;

/// Orchestrates one entity type's lifecycle over a schema and a store.
pub struct CrudService<S, T> {
    name: String,
    slug: String,
    plural: String,
    schema: Arc<S>,
    store: T,
    hooks: HookRegistry,
    events: EventNotifier,
    ignore_tag_for_sub_schema: bool,
}

impl<S, T> CrudService<S, T>
where
    S: Schema + 'static,
    T: Store,
{
    /// Create a service with default [`ServiceOptions`].
    pub fn new(name: impl Into<String>, schema: S, store: T) -> Result<Self, ServiceError> {
        Self::with_options(name, schema, store, ServiceOptions::default())
    }

    /// Create a service.
    ///
    /// Fails when the schema does not declare the store's identifier field.
    pub fn with_options(
        name: impl Into<String>,
        schema: S,
        store: T,
        options: ServiceOptions,
    ) -> Result<Self, ServiceError> {
        let name = name.into();
        if schema.field(store.id_property()).is_none() {
            return Err(ServiceError::Configuration(format!(
                "{} schema does not have the required property '{}'",
                schema.name(),
                store.id_property()
            )));
        }

        let slug = options
            .slug
            .unwrap_or_else(|| name.to_lowercase().replace(' ', ""));
        let plural = options.plural.unwrap_or_else(|| format!("{}s", name));

        Ok(Self {
            name,
            slug,
            plural,
            schema: Arc::new(schema),
            store,
            hooks: HookRegistry::new(),
            events: EventNotifier::new(),
            ignore_tag_for_sub_schema: options.ignore_tag_for_sub_schema,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn plural(&self) -> &str {
        &self.plural
    }

    pub fn id_property(&self) -> &str {
        self.store.id_property()
    }

    pub fn id_type(&self) -> IdType {
        self.store.id_type()
    }

    pub fn schema(&self) -> &S {
        &self.schema
    }

    pub fn store(&self) -> &T {
        &self.store
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn events(&self) -> &EventNotifier {
        &self.events
    }

    /// Append a pre hook to `phase`. Returns that phase's new chain length.
    pub fn pre<P: Processor + 'static>(&mut self, phase: Phase, processor: P) -> usize {
        self.hooks.pre(phase, processor)
    }

    /// Subscribe to a mutation event.
    pub fn on<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&ServiceEvent) + Send + Sync + 'static,
    {
        self.events.on(kind, handler);
    }

    // =========================================================================
    // Operations
    // =========================================================================

    pub async fn create(
        &self,
        entity: Entity,
        options: OperationOptions,
    ) -> Result<Entity, ServiceError> {
        let ignore = self.ignore_tag(&options);
        let defaulted = self.schema.make_default(&entity);
        let cleaned = self.clean(&defaulted, options.persist_tag(), ignore);

        let hooked = self.run_hooks(Phase::CreateValidate, cleaned).await?;
        let validated = gate(
            self.schema.as_ref(),
            hooked,
            options.set.as_ref(),
            options.validate_tag(),
        )
        .await?;
        let hooked = self.run_hooks(Phase::Create, validated).await?;

        let saved = self.store.create(self.strip(&hooked)).await?;
        tracing::debug!(
            service = %self.name,
            id = %saved.get(self.id_property()).map(id_to_string).unwrap_or_default(),
            "created"
        );

        self.events.emit(&ServiceEvent::Create {
            entity: saved.clone(),
            options,
        });
        Ok(self.strip(&saved))
    }

    /// Read one entity. `Ok(None)` when nothing is stored under `id`.
    pub async fn read(&self, id: &Value) -> Result<Option<Entity>, ServiceError> {
        let id = self.cast_id(id);
        let found = self.store.read(&id).await?;
        tracing::trace!(service = %self.name, id = %id_to_string(&id), found = found.is_some(), "read");
        Ok(found.map(|entity| self.strip(&entity)))
    }

    /// Replace an entity. `Ok(None)` when the store has nothing to update.
    pub async fn update(
        &self,
        entity: Entity,
        options: OperationOptions,
    ) -> Result<Option<Entity>, ServiceError> {
        let ignore = self.ignore_tag(&options);
        let defaulted = self.schema.make_default(&entity);
        let cleaned = self.clean(&defaulted, options.persist_tag(), ignore);

        let hooked = self.run_hooks(Phase::UpdateValidate, cleaned).await?;
        let validated = gate(
            self.schema.as_ref(),
            hooked,
            options.set.as_ref(),
            options.validate_tag(),
        )
        .await?;
        let hooked = self.run_hooks(Phase::Update, validated).await?;

        let saved = self.store.update(self.strip(&hooked)).await?;
        tracing::debug!(service = %self.name, updated = saved.is_some(), "updated");

        self.events.emit(&ServiceEvent::Update {
            entity: saved.clone(),
            options,
        });
        Ok(saved.map(|entity| self.strip(&entity)))
    }

    /// Update only the fields present in `patch`.
    ///
    /// The patch is validated against the stored entity with the patch laid
    /// over it; only the patch's own keys are written back.
    pub async fn partial_update(
        &self,
        patch: Entity,
        options: OperationOptions,
    ) -> Result<Option<Entity>, ServiceError> {
        let id_property = self.id_property();
        let id = match patch.get(id_property).filter(|id| is_present(id)) {
            Some(id) => self.cast_id(id),
            None => {
                tracing::warn!(service = %self.name, "partial update without identifier");
                return Err(ServiceError::MissingId {
                    id_property: id_property.to_string(),
                });
            }
        };

        let original = match self.store.read(&id).await? {
            Some(original) => original,
            None => {
                tracing::warn!(service = %self.name, id = %id_to_string(&id), "partial update target not found");
                return Err(ServiceError::NotFound {
                    id_property: id_property.to_string(),
                    id: id_to_string(&id),
                });
            }
        };

        let ignore = self.ignore_tag(&options);
        let merged = overlay(&original, &patch);
        let cleaned = self.clean(&merged, options.persist_tag(), ignore);

        let hooked = self.run_hooks(Phase::PartialValidate, cleaned).await?;
        let validated = gate(
            self.schema.as_ref(),
            hooked,
            options.set.as_ref(),
            options.validate_tag(),
        )
        .await?;

        let write = restrict_to_patch(&patch, &validated, id_property);
        tracing::trace!(service = %self.name, keys = ?write.keys().collect::<Vec<_>>(), "partial write");
        let hooked = self.run_hooks(Phase::PartialUpdate, write).await?;

        let saved = self.store.update(self.strip(&hooked)).await?;
        tracing::debug!(service = %self.name, id = %id_to_string(&id), updated = saved.is_some(), "partially updated");

        self.events.emit(&ServiceEvent::PartialUpdate {
            entity: saved.clone(),
            original,
            options,
        });
        Ok(saved.map(|entity| self.strip(&entity)))
    }

    /// Delete one entity. Deleting a missing id is not an error.
    pub async fn delete(&self, id: &Value, options: OperationOptions) -> Result<(), ServiceError> {
        let id_property = self.id_property();
        let mut target = Entity::new();
        target.insert(id_property.to_string(), id.clone());

        let hooked = self.run_hooks(Phase::Delete, target).await?;
        let id = hooked.get(id_property).cloned().unwrap_or_else(|| id.clone());

        self.store.delete(&id).await?;
        tracing::debug!(service = %self.name, id = %id_to_string(&id), "deleted");

        self.events.emit(&ServiceEvent::Delete { id, options });
        Ok(())
    }

    pub async fn delete_many(&self, query: Query) -> Result<(), ServiceError> {
        self.store.delete_many(&query).await?;
        tracing::debug!(service = %self.name, query = ?query, "deleted many");

        self.events.emit(&ServiceEvent::DeleteMany { query });
        Ok(())
    }

    /// Find matching entities, buffered.
    pub async fn find_buffered(
        &self,
        query: &Query,
        options: FindOptions,
    ) -> Result<Vec<Entity>, ServiceError> {
        let found = self.store.find(query, options).await?;
        tracing::trace!(service = %self.name, hits = found.len(), "find");
        Ok(found.iter().map(|entity| self.strip(entity)).collect())
    }

    /// Find matching entities as a lazy stream.
    pub fn find_all(&self, query: &Query, options: FindOptions) -> ServiceStream {
        let schema = Arc::clone(&self.schema);
        let ignore = self.ignore_tag_for_sub_schema;
        self.store
            .find_stream(query, options)
            .map(move |found| {
                found
                    .map(|entity| schema.strip_unknown_properties(&entity, None, ignore))
                    .map_err(ServiceError::from)
            })
            .boxed()
    }

    pub async fn count(&self, query: &Query) -> Result<usize, ServiceError> {
        Ok(self.store.count(query).await?)
    }

    // =========================================================================
    // Pipeline stages
    // =========================================================================

    fn ignore_tag(&self, options: &OperationOptions) -> bool {
        options
            .ignore_tag_for_sub_schema
            .unwrap_or(self.ignore_tag_for_sub_schema)
    }

    /// Strip to schema fields carrying `tag`, then cast.
    fn clean(&self, entity: &Entity, tag: Option<&str>, ignore: bool) -> Entity {
        let projected = self.schema.strip_unknown_properties(entity, tag, ignore);
        self.schema.cast(&projected)
    }

    fn strip(&self, entity: &Entity) -> Entity {
        self.schema
            .strip_unknown_properties(entity, None, self.ignore_tag_for_sub_schema)
    }

    fn cast_id(&self, id: &Value) -> Value {
        match self.schema.field(self.id_property()) {
            Some(field) => self.schema.cast_property(field.field_type(), id),
            None => id.clone(),
        }
    }

    async fn run_hooks(&self, phase: Phase, payload: Entity) -> Result<Entity, ServiceError> {
        self.hooks.run(phase, payload).await.map_err(|failure| {
            tracing::warn!(service = %self.name, phase = %phase, error = %failure.error, "pre hook halted");
            ServiceError::hook(phase, failure)
        })
    }
}

impl<S, T> std::fmt::Debug for CrudService<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrudService")
            .field("name", &self.name)
            .field("slug", &self.slug)
            .field("plural", &self.plural)
            .field("hooks", &self.hooks)
            .field("events", &self.events)
            .finish()
    }
}
