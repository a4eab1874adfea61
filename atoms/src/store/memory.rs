//! Process-local document backend for local runs and tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{document_id, Document, DocumentStore, StoreError, StoreResult};

/// Insertion-ordered collections behind a lock.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, Vec<Document>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("memory store lock poisoned: {}", err))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn scan(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read().map_err(poisoned)?;
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let collections = self.collections.read().map_err(poisoned)?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| document_id(doc) == Some(id)))
            .cloned())
    }

    async fn insert(&self, collection: &str, document: Document) -> StoreResult<()> {
        let id = document_id(&document)
            .ok_or_else(|| StoreError::Codec("document has no _id".to_string()))?
            .to_string();

        let mut collections = self.collections.write().map_err(poisoned)?;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|doc| document_id(doc) == Some(id.as_str())) {
            return Err(StoreError::Backend(format!("duplicate {} id {}", collection, id)));
        }
        docs.push(document);
        Ok(())
    }

    async fn replace(&self, collection: &str, id: &str, document: Document) -> StoreResult<()> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        let slot = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| document_id(doc) == Some(id)))
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        *slot = document;
        Ok(())
    }

    async fn remove(&self, collection: &str, id: &str) -> StoreResult<Document> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        let docs = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        let index = docs
            .iter()
            .position(|doc| document_id(doc) == Some(id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        Ok(docs.remove(index))
    }
}
