//! Payment ledger.

use std::collections::HashSet;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use medimart_api::{ApiJson, ApiResult};
use medimart_core::models::Transaction;
use medimart_storage::{FindQuery, Repository};
use serde_json::Value;

use super::{create_document, get_document, parse_model, round_money};
use crate::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_transaction))
        .route("/{id}", get(get_transaction))
        .route("/user/{user_id}", get(user_transactions))
}

async fn create_transaction(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<(StatusCode, ApiJson<Transaction>)> {
    let mut txn: Transaction = parse_model(body)?;
    txn.amount = round_money(txn.amount);
    let (status, ApiJson(txn)) = create_document(state.storage(), txn).await?;
    tracing::info!(
        transaction_id = %txn.meta.id,
        purpose = ?txn.purpose,
        "transaction recorded"
    );
    Ok((status, ApiJson(txn)))
}

async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiJson<Transaction>> {
    Ok(ApiJson(get_document(state.storage(), &id).await?))
}

/// Transactions where the user paid or was paid.
async fn user_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<ApiJson<Vec<Transaction>>> {
    let repo = Repository::<Transaction>::new(state.storage());
    let paid = repo
        .find(&FindQuery::new().eq("payerId", user_id.as_str()))
        .await?;
    let received = repo
        .find(&FindQuery::new().eq("payeeId", user_id.as_str()))
        .await?;

    let mut seen = HashSet::new();
    let mut all: Vec<Transaction> = paid
        .into_iter()
        .chain(received)
        .filter(|t| seen.insert(t.meta.id.clone()))
        .collect();
    all.sort_by(|a, b| {
        b.meta
            .created_at
            .cmp(&a.meta.created_at)
            .then_with(|| b.meta.id.cmp(&a.meta.id))
    });
    Ok(ApiJson(all))
}
