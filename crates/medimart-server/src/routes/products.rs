//! Medicine catalogue.

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use medimart_api::{ApiJson, ApiQuery, ApiResult};
use medimart_core::models::{Product, Retailer};
use medimart_core::validation;
use medimart_storage::{FindQuery, Repository};
use serde::Deserialize;
use serde_json::Value;

use super::{Deleted, create_document, delete_document, get_document, parse_model, update_document};
use crate::locks::retailer_key;
use crate::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    /// Name substring
    pub q: Option<String>,
    pub category: Option<String>,
    pub retailer_id: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn list_products(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ProductFilter>,
) -> ApiResult<ApiJson<Vec<Product>>> {
    let mut query = FindQuery::new()
        .eq_opt("retailerId", non_blank(filter.retailer_id))
        .sort_asc("name");
    if let Some(q) = non_blank(filter.q) {
        query = query.contains("name", q);
    }
    let category = non_blank(filter.category);
    if let Some(c) = &category {
        query = query.contains("category", c.as_str());
    }
    let mut products = Repository::<Product>::new(state.storage())
        .find(&query)
        .await?;
    if let Some(c) = category {
        products.retain(|p| {
            p.category
                .as_deref()
                .is_some_and(|pc| pc.eq_ignore_ascii_case(&c))
        });
    }
    Ok(ApiJson(products))
}

async fn create_product(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<(StatusCode, ApiJson<Product>)> {
    let product: Product = parse_model(body)?;
    validation::require("retailerId", &product.retailer_id)?;
    let storage = state.storage();
    get_document::<Retailer>(storage, &product.retailer_id).await?;
    create_document(storage, product).await
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiJson<Product>> {
    Ok(ApiJson(get_document(state.storage(), &id).await?))
}

/// Stock edits are serialised with order placement for the same shop.
async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<ApiJson<Product>> {
    let storage = state.storage();
    let current: Product = get_document(storage, &id).await?;
    let _guard = state.locks.lock(retailer_key(&current.retailer_id)).await;
    Ok(ApiJson(
        update_document(storage, &id, body, &["retailerId"]).await?,
    ))
}

async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiJson<Deleted>> {
    Ok(ApiJson(delete_document::<Product>(state.storage(), &id).await?))
}
