//! In-app notifications.

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use medimart_api::{ApiJson, ApiQuery, ApiResult};
use medimart_core::models::Notification;
use medimart_storage::{FindQuery, Repository};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{Deleted, create_document, delete_document, parse_model};
use crate::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_notification))
        // GET takes a recipient id, DELETE a notification id.
        .route(
            "/{id}",
            get(recipient_notifications).delete(delete_notification),
        )
        .route("/{id}/read", patch(mark_read))
        .route("/recipient/{recipient_id}/read-all", patch(mark_all_read))
}

async fn create_notification(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<(StatusCode, ApiJson<Notification>)> {
    let mut notification: Notification = parse_model(body)?;
    notification.read = false;
    create_document(state.storage(), notification).await
}

#[derive(Debug, Default, Deserialize)]
pub struct InboxParams {
    #[serde(default)]
    pub unread: bool,
}

async fn recipient_notifications(
    State(state): State<AppState>,
    Path(recipient_id): Path<String>,
    ApiQuery(params): ApiQuery<InboxParams>,
) -> ApiResult<ApiJson<Vec<Notification>>> {
    let mut query = FindQuery::new()
        .eq("recipientId", recipient_id.as_str())
        .newest_first();
    if params.unread {
        query = query.eq("read", false);
    }
    Ok(ApiJson(
        Repository::<Notification>::new(state.storage())
            .find(&query)
            .await?,
    ))
}

async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiJson<Notification>> {
    let updated = Repository::<Notification>::new(state.storage())
        .patch(&id, json!({ "read": true }))
        .await?;
    Ok(ApiJson(updated))
}

#[derive(Debug, Serialize)]
pub struct ReadAll {
    pub updated: usize,
}

async fn mark_all_read(
    State(state): State<AppState>,
    Path(recipient_id): Path<String>,
) -> ApiResult<ApiJson<ReadAll>> {
    let repo = Repository::<Notification>::new(state.storage());
    let unread = repo
        .find(
            &FindQuery::new()
                .eq("recipientId", recipient_id.as_str())
                .eq("read", false),
        )
        .await?;
    let mut updated = 0;
    for n in &unread {
        match repo.patch(&n.meta.id, json!({ "read": true })).await {
            Ok(_) => updated += 1,
            // Deleted between the query and the patch.
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }
    }
    tracing::debug!(recipient = %recipient_id, updated, "notifications marked read");
    Ok(ApiJson(ReadAll { updated }))
}

async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiJson<Deleted>> {
    Ok(ApiJson(
        delete_document::<Notification>(state.storage(), &id).await?,
    ))
}
