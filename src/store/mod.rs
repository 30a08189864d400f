//! Document storage
//!
//! The engine only needs an indexed document store with single-document
//! atomic patches. [`DocumentStore`] is that contract in untyped
//! `serde_json` form; [`Db`] layers typed records on top of it.
//!
//! # Architecture
//!
//! - [`DocumentStore`] - Object-safe async backend trait
//! - [`MemoryStore`] - In-process backend on `DashMap`
//! - [`Db`] - Typed façade used by the rest of the crate
//!
//! Every inserted document gets a store-assigned, monotonically increasing
//! `_seq`. Ordering questions ("first prompt", "latest prompt") are answered
//! from `_seq`, never from result position.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::model::{DocId, Kind};

pub use memory::MemoryStore;

/// Reserved field holding the document id.
pub const ID_FIELD: &str = "_id";
/// Reserved field holding the document kind.
pub const KIND_FIELD: &str = "_kind";
/// Reserved field holding the creation sequence.
pub const SEQ_FIELD: &str = "_seq";

/// A typed document.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Kind tag written alongside the document.
    const KIND: Kind;

    /// Document id.
    fn id(&self) -> &DocId;
}

/// Untyped document store backend.
#[async_trait]
pub trait DocumentStore: Send + Sync + std::fmt::Debug {
    /// Reads a document.
    async fn get(&self, id: &DocId) -> Result<Option<Value>, StoreError>;

    /// Inserts a new document and returns its creation sequence.
    ///
    /// Fails with [`StoreError::Duplicate`] if the id is taken; callers use
    /// deterministic ids to get write-time uniqueness from this.
    async fn insert(&self, kind: Kind, id: &DocId, fields: Map<String, Value>)
    -> Result<u64, StoreError>;

    /// Merges `fields` into an existing document.
    async fn patch(&self, id: &DocId, fields: Map<String, Value>) -> Result<(), StoreError>;

    /// Merges `fields` only if every `conditions` entry equals the current
    /// value (absent fields compare as `null`). Check and write are atomic.
    ///
    /// Returns whether the patch was applied.
    async fn patch_if(
        &self,
        id: &DocId,
        conditions: &Map<String, Value>,
        fields: Map<String, Value>,
    ) -> Result<bool, StoreError>;

    /// Deletes a document, returning whether it existed.
    async fn delete(&self, id: &DocId) -> Result<bool, StoreError>;

    /// Returns all documents of `kind` whose `field` equals `value`,
    /// ordered by creation sequence.
    async fn query_by_index(
        &self,
        kind: Kind,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Value>, StoreError>;
}

/// Typed handle over a [`DocumentStore`].
#[derive(Debug, Clone)]
pub struct Db {
    inner: Arc<dyn DocumentStore>,
}

impl Db {
    /// Wraps a backend.
    #[must_use]
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        Self { inner }
    }

    /// Fresh in-memory database.
    #[must_use]
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Reads and decodes a record, checking its kind.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::KindMismatch`] if the id belongs to another kind,
    /// or a serialization/backend error.
    pub async fn get<T: Record>(&self, id: &DocId) -> Result<Option<T>, StoreError> {
        let Some(doc) = self.inner.get(id).await? else {
            return Ok(None);
        };
        let actual = doc.get(KIND_FIELD).and_then(Value::as_str).unwrap_or("");
        if actual != T::KIND.as_str() {
            return Err(StoreError::KindMismatch {
                id: id.to_string(),
                expected: T::KIND.as_str(),
                actual: actual.to_string(),
            });
        }
        Ok(Some(serde_json::from_value(doc)?))
    }

    /// Inserts a record under its own id, returning the creation sequence.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] if the id already exists.
    pub async fn insert<T: Record>(&self, record: &T) -> Result<u64, StoreError> {
        let fields = into_object(serde_json::to_value(record)?)?;
        self.inner.insert(T::KIND, record.id(), fields).await
    }

    /// Merges a JSON object into a document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown ids.
    pub async fn patch(&self, id: &DocId, fields: Value) -> Result<(), StoreError> {
        self.inner.patch(id, into_object(fields)?).await
    }

    /// Conditional single-document patch; see [`DocumentStore::patch_if`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown ids.
    pub async fn patch_if(
        &self,
        id: &DocId,
        conditions: Value,
        fields: Value,
    ) -> Result<bool, StoreError> {
        let conditions = into_object(conditions)?;
        self.inner.patch_if(id, &conditions, into_object(fields)?).await
    }

    /// Deletes a document.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub async fn delete(&self, id: &DocId) -> Result<bool, StoreError> {
        self.inner.delete(id).await
    }

    /// Typed index query, ordered by creation sequence.
    ///
    /// # Errors
    ///
    /// Propagates backend and decoding failures.
    pub async fn query<T: Record>(
        &self,
        field: &str,
        value: impl Serialize + Send,
    ) -> Result<Vec<T>, StoreError> {
        let value = serde_json::to_value(value)?;
        self.inner
            .query_by_index(T::KIND, field, &value)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(StoreError::from))
            .collect()
    }
}

fn into_object(value: Value) -> Result<Map<String, Value>, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Backend(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}
