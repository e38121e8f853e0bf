//! REST routers mounted under `/api`.
//!
//! Handlers follow one shape: validate the body or parameters, issue a few
//! storage calls through [`Repository`], map the result to a status code.

pub mod admin;
pub mod auth;
pub mod blogs;
pub mod bookings;
pub mod diet_yoga;
pub mod doctors;
pub mod notifications;
pub mod orders;
pub mod patients;
pub mod products;
pub mod retailers;
pub mod search;
pub mod transactions;
pub mod uploads;

use axum::Router;
use axum::http::StatusCode;
use medimart_api::{ApiError, ApiResult};
use medimart_core::models::Document;
use medimart_storage::document::{merge_fields, strip_managed};
use medimart_storage::{DocumentStorage, Repository};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::AppConfig;
use crate::server::AppState;

pub fn api_router(cfg: &AppConfig) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/patients", patients::router())
        .nest("/doctors", doctors::router())
        .nest("/bookings", bookings::router())
        .nest("/diet-yoga", diet_yoga::router())
        .nest("/retailers", retailers::router())
        .nest("/products", products::router())
        .nest("/orders", orders::router())
        .nest("/transactions", transactions::router())
        .nest("/notifications", notifications::router())
        .nest("/upload", uploads::router(&cfg.uploads))
        .nest("/blogs", blogs::router())
        .nest("/search", search::router())
        .nest("/admin", admin::router())
}

/// Body of a successful DELETE.
#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: String,
    pub message: String,
}

impl Deleted {
    fn new<T: Document>(id: String) -> Self {
        Self {
            message: format!("{} deleted", T::COLLECTION.label()),
            id,
        }
    }
}

/// Maps a client payload onto model `T`. Storage-managed fields are dropped
/// so clients cannot choose ids or timestamps.
pub(crate) fn parse_model<T: Document>(body: Value) -> ApiResult<T> {
    if !body.is_object() {
        return Err(ApiError::bad_request(format!(
            "{} must be a JSON object",
            T::COLLECTION.label()
        )));
    }
    serde_json::from_value(strip_managed(body))
        .map_err(|e| ApiError::bad_request(format!("invalid {}: {e}", T::COLLECTION.label())))
}

/// Parses a string field into one of the lowercase enums of the domain.
pub(crate) fn parse_enum<T: DeserializeOwned>(field: &str, raw: &str) -> ApiResult<T> {
    serde_json::from_value(Value::String(raw.to_string()))
        .map_err(|_| ApiError::bad_request(format!("'{raw}' is not a valid {field}")))
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|e| ApiError::internal(e.to_string()))
}

/// Money is kept to two decimals.
pub(crate) fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

pub(crate) async fn create_document<T: Document>(
    storage: &dyn DocumentStorage,
    model: T,
) -> ApiResult<(StatusCode, medimart_api::ApiJson<T>)> {
    model.validate()?;
    let created = Repository::<T>::new(storage).create(&model).await?;
    Ok((StatusCode::CREATED, medimart_api::ApiJson(created)))
}

pub(crate) async fn get_document<T: Document>(
    storage: &dyn DocumentStorage,
    id: &str,
) -> ApiResult<T> {
    Ok(Repository::<T>::new(storage).require(id).await?)
}

/// Partial update: the fields in `body` are merged over the stored document
/// (`null` removes a field), the result is validated and written back.
/// `fixed` names fields that cannot change through this route.
pub(crate) async fn update_document<T: Document>(
    storage: &dyn DocumentStorage,
    id: &str,
    mut body: Value,
    fixed: &[&str],
) -> ApiResult<T> {
    let repo = Repository::<T>::new(storage);
    let current = repo.require(id).await?;
    if let Some(obj) = body.as_object_mut() {
        for key in fixed {
            obj.remove(*key);
        }
    }
    let merged = merge_fields(T::COLLECTION, &to_json(&current)?, body)?;
    let updated: T = serde_json::from_value(merged)
        .map_err(|e| ApiError::bad_request(format!("invalid {}: {e}", T::COLLECTION.label())))?;
    updated.validate()?;
    Ok(repo.save(&updated).await?)
}

pub(crate) async fn delete_document<T: Document>(
    storage: &dyn DocumentStorage,
    id: &str,
) -> ApiResult<Deleted> {
    Repository::<T>::new(storage).delete(id).await?;
    tracing::info!(collection = %T::COLLECTION, id, "document deleted");
    Ok(Deleted::new::<T>(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use medimart_core::models::{BookingStatus, Patient};
    use medimart_db_memory::InMemoryStorage;
    use serde_json::json;

    #[test]
    fn parse_model_drops_managed_fields() {
        let p: Patient = parse_model(json!({
            "id": "chosen",
            "createdAt": "2020-01-01T00:00:00Z",
            "name": "Asha",
            "email": "asha@mail.in"
        }))
        .unwrap();
        assert!(p.meta.id.is_empty());
        assert!(p.meta.created_at.is_none());
        assert!(parse_model::<Patient>(json!([1, 2])).is_err());
    }

    #[test]
    fn parse_enum_reports_field() {
        let s: BookingStatus = parse_enum("status", "confirmed").unwrap();
        assert_eq!(s, BookingStatus::Confirmed);
        let err = parse_enum::<BookingStatus>("status", "done").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.message().contains("done"));
    }

    #[test]
    fn money_rounds_to_cents() {
        assert_eq!(round_money(10.005_1), 10.01);
        assert_eq!(round_money(3.0 * 33.33), 99.99);
    }

    #[tokio::test]
    async fn update_merges_and_validates() {
        let storage = InMemoryStorage::new();
        let (_, medimart_api::ApiJson(created)) = create_document(
            &storage,
            Patient {
                name: "Asha".into(),
                email: "asha@mail.in".into(),
                age: Some(30),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let id = created.meta.id.clone();

        let updated: Patient =
            update_document(&storage, &id, json!({"phone": "98400", "age": null}), &[])
                .await
                .unwrap();
        assert_eq!(updated.phone.as_deref(), Some("98400"));
        assert_eq!(updated.age, None);
        assert_eq!(updated.name, "Asha");
        assert_eq!(updated.meta.created_at, created.meta.created_at);

        let err = update_document::<Patient>(&storage, &id, json!({"name": ""}), &[])
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = update_document::<Patient>(&storage, "missing", json!({}), &[])
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
