use std::collections::HashMap;

use async_trait::async_trait;
use medimart_core::Collection;
use medimart_core::time::parse_rfc3339;
use medimart_storage::document::{merge_fields, prepare_new, prepare_replacement, storage_now};
use medimart_storage::{DocumentStorage, FindQuery, StorageError, StorageResult, StoredDocument, eval};
use papaya::HashMap as PapayaHashMap;
use serde_json::Value;
use time::OffsetDateTime;

/// In-memory document storage using one papaya lock-free map per collection.
///
/// Nothing is persisted; intended for development and tests.
#[derive(Debug)]
pub struct InMemoryStorage {
    collections: HashMap<Collection, PapayaHashMap<String, StoredDocument>>,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    pub fn new() -> Self {
        let collections = Collection::ALL
            .iter()
            .map(|c| (*c, PapayaHashMap::new()))
            .collect();
        Self { collections }
    }

    fn map(&self, collection: Collection) -> StorageResult<&PapayaHashMap<String, StoredDocument>> {
        self.collections.get(&collection).ok_or_else(|| {
            StorageError::internal(format!("collection {collection} is not initialised"))
        })
    }

    /// Number of documents across all collections.
    pub fn len(&self) -> usize {
        self.collections.values().map(|m| m.pin().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every document.
    pub fn clear(&self) {
        for map in self.collections.values() {
            map.pin().clear();
        }
        tracing::debug!("in-memory storage cleared");
    }
}

fn timestamp(doc: &Value, field: &str, fallback: OffsetDateTime) -> OffsetDateTime {
    doc.get(field)
        .and_then(Value::as_str)
        .and_then(|s| parse_rfc3339(s).ok())
        .unwrap_or(fallback)
}

#[async_trait]
impl DocumentStorage for InMemoryStorage {
    async fn insert(&self, collection: Collection, document: Value) -> StorageResult<StoredDocument> {
        let now = storage_now();
        let (id, document) = prepare_new(collection, document, now)?;
        let stored = StoredDocument {
            id: id.clone(),
            collection,
            created_at: timestamp(&document, "createdAt", now),
            updated_at: timestamp(&document, "updatedAt", now),
            document,
        };
        let guard = self.map(collection)?.pin();
        match guard.try_insert(id.clone(), stored) {
            Ok(stored) => Ok(stored.clone()),
            Err(_) => Err(StorageError::already_exists(collection, id)),
        }
    }

    async fn get(&self, collection: Collection, id: &str) -> StorageResult<Option<StoredDocument>> {
        let guard = self.map(collection)?.pin();
        Ok(guard.get(id).cloned())
    }

    async fn replace(
        &self,
        collection: Collection,
        id: &str,
        document: Value,
    ) -> StorageResult<StoredDocument> {
        let guard = self.map(collection)?.pin();
        let existing = guard
            .get(id)
            .ok_or_else(|| StorageError::not_found(collection, id))?;
        let now = storage_now();
        let created_at = existing.created_at;
        let document = prepare_replacement(collection, id, document, created_at, now)?;
        let stored = StoredDocument {
            id: id.to_string(),
            collection,
            created_at,
            updated_at: timestamp(&document, "updatedAt", now),
            document,
        };
        guard.insert(id.to_string(), stored.clone());
        Ok(stored)
    }

    async fn patch(
        &self,
        collection: Collection,
        id: &str,
        fields: Value,
    ) -> StorageResult<StoredDocument> {
        let merged = {
            let guard = self.map(collection)?.pin();
            let existing = guard
                .get(id)
                .ok_or_else(|| StorageError::not_found(collection, id))?;
            merge_fields(collection, &existing.document, fields)?
        };
        self.replace(collection, id, merged).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> StorageResult<()> {
        let guard = self.map(collection)?.pin();
        match guard.remove(id) {
            Some(_) => {
                tracing::trace!(collection = %collection, id, "document deleted");
                Ok(())
            }
            None => Err(StorageError::not_found(collection, id)),
        }
    }

    async fn find(&self, collection: Collection, query: &FindQuery) -> StorageResult<Vec<StoredDocument>> {
        let guard = self.map(collection)?.pin();
        let docs: Vec<StoredDocument> = guard.values().cloned().collect();
        Ok(eval::apply(query, docs))
    }

    async fn count(&self, collection: Collection, query: &FindQuery) -> StorageResult<u64> {
        let guard = self.map(collection)?.pin();
        let n = guard.values().filter(|d| query.matches(&d.document)).count();
        Ok(n as u64)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medimart_core::models::{Booking, BookingStatus, Patient};
    use medimart_storage::Repository;
    use serde_json::json;

    #[tokio::test]
    async fn insert_assigns_id_and_timestamps() {
        let storage = InMemoryStorage::new();
        let stored = storage
            .insert(Collection::Patients, json!({"name": "Asha", "email": "asha@mail.in"}))
            .await
            .unwrap();
        assert!(!stored.id.is_empty());
        assert_eq!(stored.document["id"], json!(stored.id));
        assert!(stored.document["createdAt"].is_string());
        assert_eq!(stored.created_at, stored.updated_at);
    }

    #[tokio::test]
    async fn duplicate_id_conflicts() {
        let storage = InMemoryStorage::new();
        storage.insert(Collection::Doctors, json!({"id": "d1"})).await.unwrap();
        let err = storage
            .insert(Collection::Doctors, json!({"id": "d1"}))
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let storage = InMemoryStorage::new();
        storage.insert(Collection::Doctors, json!({"id": "x"})).await.unwrap();
        assert!(storage.get(Collection::Patients, "x").await.unwrap().is_none());
        storage.insert(Collection::Patients, json!({"id": "x"})).await.unwrap();
        assert_eq!(storage.len(), 2);
    }

    #[tokio::test]
    async fn replace_keeps_created_at() {
        let storage = InMemoryStorage::new();
        let first = storage
            .insert(Collection::Products, json!({"name": "ORS", "price": 20}))
            .await
            .unwrap();
        let second = storage
            .replace(Collection::Products, &first.id, json!({"name": "ORS Lemon", "price": 22}))
            .await
            .unwrap();
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.document["createdAt"], first.document["createdAt"]);
        assert_eq!(second.document["name"], "ORS Lemon");
        assert!(second.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn patch_merges_fields() {
        let storage = InMemoryStorage::new();
        let doc = storage
            .insert(Collection::Bookings, json!({"status": "pending", "amount": 500}))
            .await
            .unwrap();
        let patched = storage
            .patch(Collection::Bookings, &doc.id, json!({"status": "confirmed"}))
            .await
            .unwrap();
        assert_eq!(patched.document["status"], "confirmed");
        assert_eq!(patched.document["amount"], 500);
    }

    #[tokio::test]
    async fn missing_documents() {
        let storage = InMemoryStorage::new();
        assert!(storage.get(Collection::Orders, "nope").await.unwrap().is_none());
        assert!(
            storage
                .replace(Collection::Orders, "nope", json!({}))
                .await
                .unwrap_err()
                .is_not_found()
        );
        assert!(
            storage
                .patch(Collection::Orders, "nope", json!({}))
                .await
                .unwrap_err()
                .is_not_found()
        );
        assert!(storage.delete(Collection::Orders, "nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn find_filters_sorts_and_counts() {
        let storage = InMemoryStorage::new();
        for (slot, status) in [("11:00", "pending"), ("09:00", "cancelled"), ("10:00", "confirmed")] {
            storage
                .insert(
                    Collection::Bookings,
                    json!({"doctorId": "d1", "date": "2030-01-01", "timeSlot": slot, "status": status}),
                )
                .await
                .unwrap();
        }
        storage
            .insert(Collection::Bookings, json!({"doctorId": "d2", "timeSlot": "08:00"}))
            .await
            .unwrap();

        let q = FindQuery::new()
            .eq("doctorId", "d1")
            .ne("status", "cancelled")
            .sort_asc("timeSlot");
        let found = storage.find(Collection::Bookings, &q).await.unwrap();
        let slots: Vec<_> = found.iter().map(|d| d.document["timeSlot"].clone()).collect();
        assert_eq!(slots, vec![json!("10:00"), json!("11:00")]);
        assert_eq!(storage.count(Collection::Bookings, &q).await.unwrap(), 2);
        assert_eq!(storage.count(Collection::Bookings, &FindQuery::new()).await.unwrap(), 4);

        let one = storage.find_one(Collection::Bookings, &q).await.unwrap().unwrap();
        assert_eq!(one.document["timeSlot"], "10:00");
    }

    #[tokio::test]
    async fn typed_repository_round_trip() {
        let storage = InMemoryStorage::new();
        let repo = Repository::<Patient>::new(&storage);
        let created = repo
            .create(&Patient {
                name: "Ravi".into(),
                email: "ravi@mail.in".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(!created.meta.id.is_empty());
        assert!(created.meta.created_at.is_some());

        let fetched = repo.require(&created.meta.id).await.unwrap();
        assert_eq!(fetched.name, "Ravi");

        let bookings = Repository::<Booking>::new(&storage);
        let b = bookings
            .create(&Booking {
                doctor_id: "d1".into(),
                patient_id: created.meta.id.clone(),
                ..Default::default()
            })
            .await
            .unwrap();
        let mut b2 = b.clone();
        b2.status = BookingStatus::Confirmed;
        let saved = bookings.save(&b2).await.unwrap();
        assert_eq!(saved.status, BookingStatus::Confirmed);
        assert_eq!(saved.meta.created_at, b.meta.created_at);

        repo.delete(&created.meta.id).await.unwrap();
        assert!(repo.get(&created.meta.id).await.unwrap().is_none());
        assert!(repo.require(&created.meta.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn concurrent_inserts() {
        let storage = std::sync::Arc::new(InMemoryStorage::new());
        let mut handles = Vec::new();
        for i in 0..32 {
            let storage = storage.clone();
            handles.push(tokio::spawn(async move {
                storage
                    .insert(Collection::Notifications, json!({"recipientId": "p1", "n": i}))
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let q = FindQuery::new().eq("recipientId", "p1");
        assert_eq!(storage.count(Collection::Notifications, &q).await.unwrap(), 32);
    }
}
