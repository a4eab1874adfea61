//! Entity Store: typed CRUD handles over a pluggable document backend.

pub mod dynamo;
pub mod memory;
pub mod query;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

pub use dynamo::DynamoStore;
pub use memory::MemoryStore;
pub use query::{Condition, Filter, FindQuery, Projection, QueryError, Sort, SortDirection};

/// A stored entity as a JSON object.
pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "_id";
pub const DATE_CREATED_FIELD: &str = "dateCreated";

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{collection} {id} not found")]
    NotFound { collection: String, id: String },

    /// Persistence-level validation failed
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("document codec error: {0}")]
    Codec(String),

    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Raw document persistence, one implementation per backend.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents of a collection, in storage order.
    async fn scan(&self, collection: &str) -> StoreResult<Vec<Document>>;

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Fails if a document with the same `_id` already exists.
    async fn insert(&self, collection: &str, document: Document) -> StoreResult<()>;

    /// Fails with [`StoreError::NotFound`] if `id` is absent.
    async fn replace(&self, collection: &str, id: &str, document: Document) -> StoreResult<()>;

    /// Returns the removed document.
    async fn remove(&self, collection: &str, id: &str) -> StoreResult<Document>;
}

/// A persisted resource type.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    /// Schema-level checks run on every write.
    fn validate(&self) -> Result<(), String>;
}

/// Handle on one collection. Cheap to clone; injected wherever it is needed.
pub struct EntityStore<T> {
    backend: Arc<dyn DocumentStore>,
    marker: PhantomData<fn() -> T>,
}

impl<T> Clone for EntityStore<T> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            marker: PhantomData,
        }
    }
}

impl<T: Entity> EntityStore<T> {
    pub fn new(backend: Arc<dyn DocumentStore>) -> Self {
        Self {
            backend,
            marker: PhantomData,
        }
    }

    pub async fn find(&self, query: &FindQuery) -> StoreResult<Vec<Document>> {
        let docs = self.backend.scan(T::COLLECTION).await?;
        Ok(query.execute(docs))
    }

    pub async fn find_by_id(&self, id: &str, projection: Option<&Projection>) -> StoreResult<Document> {
        let doc = self
            .backend
            .get(T::COLLECTION, id)
            .await?
            .ok_or_else(|| StoreError::not_found(T::COLLECTION, id))?;

        Ok(match projection {
            Some(projection) => projection.apply(doc),
            None => doc,
        })
    }

    pub async fn find_one(&self, filter: &Filter) -> StoreResult<Option<T>> {
        let docs = self.backend.scan(T::COLLECTION).await?;
        docs.into_iter()
            .find(|doc| filter.matches(doc))
            .map(decode::<T>)
            .transpose()
    }

    pub async fn get(&self, id: &str) -> StoreResult<T> {
        decode(self.find_by_id(id, None).await?)
    }

    pub async fn count(&self, filter: &Filter) -> StoreResult<u64> {
        let docs = self.backend.scan(T::COLLECTION).await?;
        Ok(docs.iter().filter(|doc| filter.matches(doc)).count() as u64)
    }

    /// Assigns an id and `dateCreated` when missing, validates, and inserts.
    pub async fn create(&self, entity: T) -> StoreResult<T> {
        entity.validate().map_err(StoreError::Validation)?;

        let mut doc = encode(&entity)?;
        if entity.id().is_empty() {
            doc.insert(ID_FIELD.to_string(), Value::String(uuid::Uuid::new_v4().to_string()));
        }
        if doc.get(DATE_CREATED_FIELD).map_or(true, Value::is_null) {
            doc.insert(
                DATE_CREATED_FIELD.to_string(),
                Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }

        self.backend.insert(T::COLLECTION, doc.clone()).await?;
        decode(doc)
    }

    /// Full replacement of the document stored under `id`.
    pub async fn update(&self, id: &str, entity: T) -> StoreResult<T> {
        entity.validate().map_err(StoreError::Validation)?;

        let mut doc = encode(&entity)?;
        doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));

        self.backend.replace(T::COLLECTION, id, doc.clone()).await?;
        decode(doc)
    }

    pub async fn delete(&self, id: &str) -> StoreResult<T> {
        decode(self.backend.remove(T::COLLECTION, id).await?)
    }
}

fn encode<T: Serialize>(entity: &T) -> StoreResult<Document> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::Codec(format!("expected an object, got {}", other))),
        Err(e) => Err(StoreError::Codec(e.to_string())),
    }
}

fn decode<T: DeserializeOwned>(doc: Document) -> StoreResult<T> {
    serde_json::from_value(Value::Object(doc)).map_err(|e| StoreError::Codec(e.to_string()))
}

/// Reads `_id` from a raw document.
pub fn document_id(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}
