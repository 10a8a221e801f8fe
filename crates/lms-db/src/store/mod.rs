//! Document store port.
//!
//! The streak engine only ever needs keyed reads and writes plus
//! equality queries over top-level fields, so that is all the port exposes.
//! Documents are plain JSON objects; typed access lives in
//! [`crate::repositories`].

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::{Map, Value};

/// Errors raised by a [`DocumentStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Document {collection}/{id} already exists")]
    AlreadyExists { collection: String, id: String },
    #[error("Document {collection}/{id} does not exist")]
    Missing { collection: String, id: String },
    #[error("Failed to decode document {collection}/{id}: {source}")]
    Decode {
        collection: String,
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to encode document for {collection}: {source}")]
    Encode {
        collection: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Document store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A document returned by [`DocumentStore::query`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub data: Value,
}

/// Equality condition on a top-level document field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether `doc` satisfies this filter.
    pub fn matches(&self, doc: &Value) -> bool {
        doc.get(&self.field) == Some(&self.value)
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync + std::fmt::Debug {
    /// Fetch a document by id.
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>>;

    /// Insert a new document. Fails with [`StoreError::AlreadyExists`] if the id is taken.
    async fn create(&self, collection: &str, id: &str, doc: Value) -> StoreResult<String>;

    /// Insert or fully replace a document.
    async fn set(&self, collection: &str, id: &str, doc: Value) -> StoreResult<()>;

    /// Merge `patch` into the top level of an existing document.
    async fn update(&self, collection: &str, id: &str, patch: Map<String, Value>) -> StoreResult<()>;

    /// All documents in `collection` matching every filter, oldest first.
    async fn query(&self, collection: &str, filters: &[Filter]) -> StoreResult<Vec<StoredDocument>>;
}
