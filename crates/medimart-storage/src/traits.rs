//! The storage contract.

use async_trait::async_trait;
use medimart_core::Collection;
use serde_json::Value;

use crate::StorageResult;
use crate::types::{FindQuery, StoredDocument};

/// Schemaless document store partitioned by [`Collection`].
///
/// Backends own `id`, `createdAt` and `updatedAt`; see
/// [`crate::document`] for the shared stamping rules.
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    /// Inserts a new document and returns it as stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if the caller-supplied id is taken.
    async fn insert(&self, collection: Collection, document: Value) -> StorageResult<StoredDocument>;

    /// Reads a document by id. `None` if it does not exist.
    async fn get(&self, collection: Collection, id: &str) -> StorageResult<Option<StoredDocument>>;

    /// Replaces the whole body of an existing document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the document does not exist.
    async fn replace(
        &self,
        collection: Collection,
        id: &str,
        document: Value,
    ) -> StorageResult<StoredDocument>;

    /// Merges top-level fields into an existing document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the document does not exist.
    async fn patch(
        &self,
        collection: Collection,
        id: &str,
        fields: Value,
    ) -> StorageResult<StoredDocument>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the document does not exist.
    async fn delete(&self, collection: Collection, id: &str) -> StorageResult<()>;

    async fn find(&self, collection: Collection, query: &FindQuery) -> StorageResult<Vec<StoredDocument>>;

    async fn find_one(
        &self,
        collection: Collection,
        query: &FindQuery,
    ) -> StorageResult<Option<StoredDocument>> {
        let query = query.clone().limit(1);
        Ok(self.find(collection, &query).await?.into_iter().next())
    }

    /// Counts matching documents. Sort, limit and offset are ignored.
    async fn count(&self, collection: Collection, query: &FindQuery) -> StorageResult<u64>;

    /// Checks the backend is reachable.
    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}
