//! In-memory storage backend for the MediMart server.
//!
//! This crate provides an in-memory implementation of the `DocumentStorage`
//! trait from `medimart-storage`, using papaya lock-free HashMap for
//! concurrent access.
//!
//! # Example
//!
//! ```ignore
//! use medimart_db_memory::InMemoryStorage;
//! use medimart_storage::DocumentStorage;
//!
//! let storage = InMemoryStorage::new();
//! let patient = serde_json::json!({"name": "Asha", "email": "asha@mail.in"});
//! let created = storage.insert(Collection::Patients, patient).await?;
//! ```

pub mod storage;

pub use medimart_storage::{DocumentStorage, StorageError, StoredDocument};
pub use storage::InMemoryStorage;

/// Creates a new shareable in-memory storage instance.
pub fn create_storage() -> medimart_storage::DynStorage {
    std::sync::Arc::new(InMemoryStorage::new())
}
