//! Repository trait for typed storage operations, and [`Collection`], the typed handle
//! that implements it on top of [`DocumentStore`].

use std::marker::PhantomData;

use async_trait::async_trait;
use serde_json::Value;

use crate::codec::Message;
use crate::document_store::DocumentStore;
use crate::error::{DocStoreError, Result};
use crate::patch::FieldPatch;
use crate::predicate::Predicate;
use crate::query::ListQuery;

/// Generic async repository: save, find_by_id, find_all, delete.
#[async_trait]
pub trait Repository<T> {
    /// Persists the entity as a new document.
    async fn save(&self, entity: &T) -> Result<()>;
    /// Returns the entity with the given id, or None if not found.
    async fn find_by_id(&self, id: &str) -> Result<Option<T>>;
    /// Returns all entities in insertion order.
    async fn find_all(&self) -> Result<Vec<T>>;
    /// Deletes the entities with the given id; returns true if any row was deleted.
    async fn delete(&self, id: &str) -> Result<bool>;
}

/// A named collection whose documents decode as `M`.
pub struct Collection<M> {
    store: DocumentStore,
    name: String,
    _marker: PhantomData<fn() -> M>,
}

impl<M> Clone for Collection<M> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            name: self.name.clone(),
            _marker: PhantomData,
        }
    }
}

impl<M: Message> Collection<M> {
    pub(crate) fn new(store: DocumentStore, name: String) -> Self {
        Self {
            store,
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// First document matching `predicate`, or None.
    pub async fn find(&self, predicate: &Predicate) -> Result<Option<M>> {
        optional(self.store.get(&self.name, predicate).await)
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Vec<M>> {
        self.store.list(&self.name, query).await
    }

    pub async fn upsert(&self, id: impl Into<Value>, message: &M) -> Result<()> {
        self.store.upsert(&self.name, id, message).await
    }

    pub async fn patch(&self, id: impl Into<Value>, fields: &FieldPatch) -> Result<u64> {
        self.store.patch_fields(&self.name, id, fields).await
    }
}

#[async_trait]
impl<M: Message> Repository<M> for Collection<M> {
    async fn save(&self, entity: &M) -> Result<()> {
        self.store.insert(&self.name, entity).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<M>> {
        optional(self.store.get_by_id(&self.name, id).await)
    }

    async fn find_all(&self) -> Result<Vec<M>> {
        self.store.list(&self.name, &ListQuery::new()).await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.store.delete(&self.name, id).await? > 0)
    }
}

fn optional<M>(result: Result<M>) -> Result<Option<M>> {
    match result {
        Ok(message) => Ok(Some(message)),
        Err(DocStoreError::NotFound { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}
