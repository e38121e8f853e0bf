//! Retailer shops, their catalogue, incoming orders and buyer feedback.

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use medimart_api::{ApiJson, ApiQuery, ApiResult};
use medimart_core::models::{Order, OrderStatus, Product, Retailer};
use medimart_storage::{FindQuery, Repository};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use super::{
    Deleted, create_document, delete_document, get_document, parse_enum, parse_model,
    update_document,
};
use crate::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_retailer).get(list_retailers))
        .route(
            "/{id}",
            get(get_retailer).put(update_retailer).delete(delete_retailer),
        )
        .route("/{id}/orders", get(retailer_orders))
        .route("/{id}/feedback", get(retailer_feedback))
        .route(
            "/{id}/products",
            post(create_retailer_product).get(retailer_products),
        )
}

async fn create_retailer(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<(StatusCode, ApiJson<Retailer>)> {
    create_document(state.storage(), parse_model::<Retailer>(body)?).await
}

async fn list_retailers(State(state): State<AppState>) -> ApiResult<ApiJson<Vec<Retailer>>> {
    let query = FindQuery::new().sort_asc("shopName");
    Ok(ApiJson(
        Repository::<Retailer>::new(state.storage()).find(&query).await?,
    ))
}

async fn get_retailer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiJson<Retailer>> {
    Ok(ApiJson(get_document(state.storage(), &id).await?))
}

async fn update_retailer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<ApiJson<Retailer>> {
    Ok(ApiJson(update_document(state.storage(), &id, body, &["email"]).await?))
}

async fn delete_retailer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiJson<Deleted>> {
    Ok(ApiJson(delete_document::<Retailer>(state.storage(), &id).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<String>,
}

async fn retailer_orders(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(filter): ApiQuery<OrderFilter>,
) -> ApiResult<ApiJson<Vec<Order>>> {
    let storage = state.storage();
    get_document::<Retailer>(storage, &id).await?;
    let status: Option<OrderStatus> = match filter.status.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => Some(parse_enum("status", s)?),
        _ => None,
    };
    let query = FindQuery::new()
        .eq("retailerId", id.as_str())
        .eq_opt("orderStatus", status.map(|s| s.to_string()))
        .newest_first();
    Ok(ApiJson(Repository::<Order>::new(storage).find(&query).await?))
}

/// One buyer's feedback on a delivered order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetailerFeedback {
    pub order_id: String,
    pub buyer_id: String,
    pub rating: u8,
    pub comment: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

async fn retailer_feedback(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiJson<Vec<RetailerFeedback>>> {
    let storage = state.storage();
    get_document::<Retailer>(storage, &id).await?;
    let query = FindQuery::new()
        .eq("retailerId", id.as_str())
        .ne("feedback", Value::Null);
    let mut feedback: Vec<RetailerFeedback> = Repository::<Order>::new(storage)
        .find(&query)
        .await?
        .into_iter()
        .filter_map(|order| {
            let fb = order.feedback?;
            Some(RetailerFeedback {
                order_id: order.meta.id,
                buyer_id: order.buyer_id,
                rating: fb.rating,
                comment: fb.comment,
                created_at: fb.created_at,
            })
        })
        .collect();
    feedback.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(ApiJson(feedback))
}

/// The product is always listed under the retailer in the path.
async fn create_retailer_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<(StatusCode, ApiJson<Product>)> {
    let storage = state.storage();
    get_document::<Retailer>(storage, &id).await?;
    let mut product: Product = parse_model(body)?;
    product.retailer_id = id;
    create_document(storage, product).await
}

async fn retailer_products(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiJson<Vec<Product>>> {
    let storage = state.storage();
    get_document::<Retailer>(storage, &id).await?;
    let query = FindQuery::new()
        .eq("retailerId", id.as_str())
        .sort_asc("name");
    Ok(ApiJson(Repository::<Product>::new(storage).find(&query).await?))
}
