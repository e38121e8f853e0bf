//! # medimart-storage
//!
//! Storage abstraction layer for the MediMart server.
//!
//! This crate defines the [`DocumentStorage`] trait, the query model and the
//! typed [`Repository`] wrapper. Implementations live in separate crates
//! (`medimart-db-memory`, `medimart-db-postgres`).
//!
//! ## Example
//!
//! ```ignore
//! use medimart_core::models::Booking;
//! use medimart_storage::{FindQuery, Repository};
//!
//! async fn doctor_bookings(storage: &dyn DocumentStorage, doctor_id: &str) -> StorageResult<Vec<Booking>> {
//!     let query = FindQuery::new().eq("doctorId", doctor_id).sort_asc("date");
//!     Repository::<Booking>::new(storage).find(&query).await
//! }
//! ```

pub mod document;
mod error;
pub mod eval;
mod repository;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use repository::Repository;
pub use traits::DocumentStorage;
pub use types::{Filter, FindQuery, SortSpec, StoredDocument};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared storage trait object.
pub type DynStorage = std::sync::Arc<dyn DocumentStorage>;

pub mod prelude {
    pub use crate::error::{ErrorCategory, StorageError};
    pub use crate::repository::Repository;
    pub use crate::traits::DocumentStorage;
    pub use crate::types::{Filter, FindQuery, SortSpec, StoredDocument};
    pub use crate::{DynStorage, StorageResult};
}
