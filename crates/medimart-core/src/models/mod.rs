//! Marketplace documents.
//!
//! Every model serialises to the camelCase JSON stored in its collection.
//! Storage owns `id`, `createdAt` and `updatedAt`; the typed models carry them
//! through [`Meta`] so a document read back from storage round-trips.

pub mod blog;
pub mod booking;
pub mod credential;
pub mod diet_yoga;
pub mod doctor;
pub mod notification;
pub mod order;
pub mod patient;
pub mod patient_record;
pub mod product;
pub mod retailer;
pub mod transaction;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::collection::Collection;

pub use blog::AiBlog;
pub use booking::{Booking, BookingStatus, PaymentStatus, Supplement};
pub use credential::{Credential, Role};
pub use diet_yoga::{DietYoga, MealPlan, YogaSession};
pub use doctor::{Doctor, DoctorData, DoctorSource, DoctorSummary};
pub use notification::{Notification, NotificationKind};
pub use order::{
    Order, OrderFeedback, OrderItem, OrderPaymentStatus, OrderStatus, RetailerStatus,
};
pub use patient::Patient;
pub use patient_record::{DoctorConnection, PatientRecord, PrescribedMedicine, Prescription};
pub use product::Product;
pub use retailer::Retailer;
pub use transaction::{Transaction, TransactionPurpose, TransactionStatus};

/// Storage-managed fields shared by every document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<OffsetDateTime>,
}

impl Meta {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// A typed document bound to one collection.
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;

    fn meta(&self) -> &Meta;

    fn id(&self) -> &str {
        &self.meta().id
    }

    /// Field-level checks run before the document is written.
    fn validate(&self) -> crate::error::Result<()>;
}

macro_rules! impl_document {
    ($ty:ty, $collection:expr) => {
        impl $crate::models::Document for $ty {
            const COLLECTION: $crate::collection::Collection = $collection;

            fn meta(&self) -> &$crate::models::Meta {
                &self.meta
            }

            fn validate(&self) -> $crate::error::Result<()> {
                <$ty>::validate(self)
            }
        }
    };
}

pub(crate) use impl_document;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn meta_skips_empty_fields() {
        let v = serde_json::to_value(Meta::default()).unwrap();
        assert_eq!(v, json!({}));
    }

    #[test]
    fn meta_reads_storage_fields() {
        let meta: Meta = serde_json::from_value(json!({
            "id": "abc",
            "createdAt": "2024-01-02T03:04:05Z",
            "updatedAt": "2024-01-02T03:04:05Z"
        }))
        .unwrap();
        assert_eq!(meta.id, "abc");
        assert!(meta.created_at.is_some());
        assert_eq!(meta.created_at, meta.updated_at);
    }
}
