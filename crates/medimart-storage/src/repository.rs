//! Typed access to one collection.

use std::marker::PhantomData;

use medimart_core::models::Document;
use serde_json::Value;

use crate::StorageResult;
use crate::error::StorageError;
use crate::traits::DocumentStorage;
use crate::types::FindQuery;

/// Wraps a [`DocumentStorage`] with (de)serialization for model `T`.
pub struct Repository<'a, T> {
    storage: &'a dyn DocumentStorage,
    _model: PhantomData<fn() -> T>,
}

impl<'a, T: Document> Repository<'a, T> {
    pub fn new(storage: &'a dyn DocumentStorage) -> Self {
        Self {
            storage,
            _model: PhantomData,
        }
    }

    pub async fn create(&self, model: &T) -> StorageResult<T> {
        let value = serde_json::to_value(model)?;
        self.storage.insert(T::COLLECTION, value).await?.into_model()
    }

    pub async fn get(&self, id: &str) -> StorageResult<Option<T>> {
        match self.storage.get(T::COLLECTION, id).await? {
            Some(doc) => Ok(Some(doc.into_model()?)),
            None => Ok(None),
        }
    }

    /// Like [`Self::get`] but a missing document is an error.
    pub async fn require(&self, id: &str) -> StorageResult<T> {
        self.get(id)
            .await?
            .ok_or_else(|| StorageError::not_found(T::COLLECTION, id))
    }

    pub async fn exists(&self, id: &str) -> StorageResult<bool> {
        Ok(self.storage.get(T::COLLECTION, id).await?.is_some())
    }

    /// Writes the model back under its own id.
    pub async fn save(&self, model: &T) -> StorageResult<T> {
        let value = serde_json::to_value(model)?;
        self.storage
            .replace(T::COLLECTION, model.id(), value)
            .await?
            .into_model()
    }

    pub async fn patch(&self, id: &str, fields: Value) -> StorageResult<T> {
        self.storage.patch(T::COLLECTION, id, fields).await?.into_model()
    }

    pub async fn delete(&self, id: &str) -> StorageResult<()> {
        self.storage.delete(T::COLLECTION, id).await
    }

    pub async fn find(&self, query: &FindQuery) -> StorageResult<Vec<T>> {
        self.storage
            .find(T::COLLECTION, query)
            .await?
            .into_iter()
            .map(|d| d.into_model())
            .collect()
    }

    pub async fn find_one(&self, query: &FindQuery) -> StorageResult<Option<T>> {
        match self.storage.find_one(T::COLLECTION, query).await? {
            Some(doc) => Ok(Some(doc.into_model()?)),
            None => Ok(None),
        }
    }

    pub async fn count(&self, query: &FindQuery) -> StorageResult<u64> {
        self.storage.count(T::COLLECTION, query).await
    }
}
