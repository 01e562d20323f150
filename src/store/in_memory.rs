//! InMemoryStore - HashMap-backed store for testing and development.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use futures::future;
use futures::stream::{self, StreamExt};
use serde_json::Value;

use super::{EntityStream, FindOptions, IdType, Store, StoreError};
use crate::entity::{id_to_string, is_present, matches, Entity, Query};

/// Internal stored representation of a record.
struct StoredEntity {
    entity: Entity,
    /// Insertion order, used to keep `find` results stable.
    seq: u64,
}

#[derive(Default)]
struct Inner {
    records: HashMap<String, StoredEntity>,
    next_seq: u64,
    next_id: u64,
}

/// In-memory store backed by a HashMap keyed by the rendered identifier.
///
/// Identifiers are assigned sequentially (`"1"`, `"2"`, ... or `1`, `2`, ...
/// for [`IdType::Number`]). Clone-friendly via Arc.
#[derive(Clone)]
pub struct InMemoryStore {
    id_property: String,
    id_type: IdType,
    storage: Arc<RwLock<Inner>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Create an empty store with a string `_id` identifier.
    pub fn new() -> Self {
        Self::with_id("_id", IdType::String)
    }

    /// Create an empty store with a custom identifier field.
    pub fn with_id(id_property: impl Into<String>, id_type: IdType) -> Self {
        Self {
            id_property: id_property.into(),
            id_type,
            storage: Arc::new(RwLock::new(Inner::default())),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.storage.read().map(|s| s.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch the raw stored record, bypassing any schema.
    pub fn raw(&self, id: &Value) -> Option<Entity> {
        let storage = self.storage.read().ok()?;
        storage
            .records
            .get(&id_to_string(id))
            .map(|stored| stored.entity.clone())
    }

    /// Keys of the matching records, in insertion order, paged.
    fn select_keys(&self, query: &Query, options: FindOptions) -> Result<Vec<String>, StoreError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| StoreError::LockPoisoned("find"))?;

        let mut hits: Vec<(&String, u64)> = storage
            .records
            .iter()
            .filter(|(_, stored)| matches(&stored.entity, query))
            .map(|(key, stored)| (key, stored.seq))
            .collect();
        hits.sort_by_key(|(_, seq)| *seq);

        Ok(hits
            .into_iter()
            .skip(options.skip.unwrap_or(0))
            .take(options.limit.unwrap_or(usize::MAX))
            .map(|(key, _)| key.clone())
            .collect())
    }

    fn select(&self, query: &Query, options: FindOptions) -> Result<Vec<Entity>, StoreError> {
        let keys = self.select_keys(query, options)?;
        let storage = self
            .storage
            .read()
            .map_err(|_| StoreError::LockPoisoned("find"))?;

        Ok(keys
            .iter()
            .filter_map(|key| storage.records.get(key))
            .map(|stored| stored.entity.clone())
            .collect())
    }

    fn missing_id(&self) -> StoreError {
        StoreError::MissingId {
            id_property: self.id_property.clone(),
        }
    }
}

#[async_trait]
impl Store for InMemoryStore {
    fn id_property(&self) -> &str {
        &self.id_property
    }

    fn id_type(&self) -> IdType {
        self.id_type
    }

    async fn create(&self, entity: Entity) -> Result<Entity, StoreError> {
        let mut entity = entity;
        let mut storage = self
            .storage
            .write()
            .map_err(|_| StoreError::LockPoisoned("create"))?;

        let supplied = entity.get(&self.id_property).filter(|id| is_present(id)).cloned();
        let id = match supplied {
            Some(id) => id,
            None => loop {
                // Skip ids a caller already claimed explicitly.
                storage.next_id += 1;
                let candidate = match self.id_type {
                    IdType::String => Value::String(storage.next_id.to_string()),
                    IdType::Number => Value::from(storage.next_id),
                };
                if !storage.records.contains_key(&id_to_string(&candidate)) {
                    break candidate;
                }
            },
        };

        let key = id_to_string(&id);
        if storage.records.contains_key(&key) {
            return Err(StoreError::Duplicate { id: key });
        }

        entity.insert(self.id_property.clone(), id);
        storage.next_seq += 1;
        let seq = storage.next_seq;
        storage.records.insert(
            key,
            StoredEntity {
                entity: entity.clone(),
                seq,
            },
        );

        Ok(entity)
    }

    async fn read(&self, id: &Value) -> Result<Option<Entity>, StoreError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| StoreError::LockPoisoned("read"))?;

        Ok(storage
            .records
            .get(&id_to_string(id))
            .map(|stored| stored.entity.clone()))
    }

    async fn update(&self, entity: Entity) -> Result<Option<Entity>, StoreError> {
        let id = entity
            .get(&self.id_property)
            .filter(|id| is_present(id))
            .ok_or_else(|| self.missing_id())?;
        let key = id_to_string(id);

        let mut storage = self
            .storage
            .write()
            .map_err(|_| StoreError::LockPoisoned("update"))?;

        let Some(stored) = storage.records.get_mut(&key) else {
            return Ok(None);
        };
        for (field, value) in entity {
            stored.entity.insert(field, value);
        }

        Ok(Some(stored.entity.clone()))
    }

    async fn delete(&self, id: &Value) -> Result<(), StoreError> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| StoreError::LockPoisoned("delete"))?;

        storage.records.remove(&id_to_string(id));
        Ok(())
    }

    async fn delete_many(&self, query: &Query) -> Result<(), StoreError> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| StoreError::LockPoisoned("delete_many"))?;

        storage
            .records
            .retain(|_, stored| !matches(&stored.entity, query));
        Ok(())
    }

    async fn find(&self, query: &Query, options: FindOptions) -> Result<Vec<Entity>, StoreError> {
        self.select(query, options)
    }

    /// Matching keys are fixed when the stream is created; each record is
    /// fetched only when polled, so records deleted in between are skipped.
    fn find_stream(&self, query: &Query, options: FindOptions) -> EntityStream {
        let keys = match self.select_keys(query, options) {
            Ok(keys) => keys,
            Err(e) => return stream::once(future::ready(Err(e))).boxed(),
        };
        let storage = Arc::clone(&self.storage);
        stream::iter(keys)
            .filter_map(move |key| {
                let fetched = match storage.read() {
                    Ok(storage) => storage.records.get(&key).map(|stored| Ok(stored.entity.clone())),
                    Err(_) => Some(Err(StoreError::LockPoisoned("find"))),
                };
                future::ready(fetched)
            })
            .boxed()
    }

    async fn count(&self, query: &Query) -> Result<usize, StoreError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| StoreError::LockPoisoned("count"))?;

        Ok(storage
            .records
            .values()
            .filter(|stored| matches(&stored.entity, query))
            .count())
    }
}
