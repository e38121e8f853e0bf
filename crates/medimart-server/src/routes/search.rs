//! Cross-collection text search.

use axum::{Router, extract::State, routing::get};
use medimart_api::{ApiError, ApiJson, ApiQuery, ApiResult};
use medimart_core::models::{AiBlog, Doctor, Document, Product};
use medimart_storage::{DocumentStorage, FindQuery, Repository};
use serde::{Deserialize, Serialize};

use crate::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(search))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    Doctors,
    Products,
    Blogs,
}

impl Group {
    fn parse(raw: &str) -> ApiResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "doctors" | "doctor" => Ok(Group::Doctors),
            "products" | "product" => Ok(Group::Products),
            "blogs" | "blog" => Ok(Group::Blogs),
            other => Err(ApiError::bad_request(format!(
                "'{other}' is not a search type (doctors, products, blogs)"
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub query: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub doctors: Vec<Doctor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<Product>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blogs: Vec<AiBlog>,
}

async fn find_matching<T: Document>(
    storage: &dyn DocumentStorage,
    fields: [&str; 2],
    needle: &str,
    sort: &str,
    limit: usize,
) -> ApiResult<Vec<T>> {
    let query = FindQuery::new()
        .any_contains(fields, needle)
        .sort_asc(sort)
        .limit(limit);
    Ok(Repository::<T>::new(storage).find(&query).await?)
}

async fn search(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> ApiResult<ApiJson<SearchResults>> {
    let q = params.q.trim();
    if q.is_empty() {
        return Err(ApiError::bad_request("query parameter 'q' is required"));
    }
    let only = match params.kind.as_deref().filter(|k| !k.trim().is_empty()) {
        Some(raw) => Some(Group::parse(raw)?),
        None => None,
    };
    let wants = |g: Group| only.is_none_or(|o| o == g);
    let limit = state.config.search.clamp(params.limit);
    let storage = state.storage();

    let mut results = SearchResults {
        query: q.to_string(),
        doctors: Vec::new(),
        products: Vec::new(),
        blogs: Vec::new(),
    };
    if wants(Group::Doctors) {
        results.doctors =
            find_matching(storage, ["name", "specialization"], q, "name", limit).await?;
    }
    if wants(Group::Products) {
        results.products = find_matching(storage, ["name", "category"], q, "name", limit).await?;
    }
    if wants(Group::Blogs) {
        results.blogs = find_matching(storage, ["title", "topic"], q, "title", limit).await?;
    }
    tracing::debug!(
        query = %q,
        doctors = results.doctors.len(),
        products = results.products.len(),
        blogs = results.blogs.len(),
        "search"
    );
    Ok(ApiJson(results))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_names() {
        assert_eq!(Group::parse("Doctors").unwrap(), Group::Doctors);
        assert_eq!(Group::parse(" blog ").unwrap(), Group::Blogs);
        assert!(Group::parse("patients").is_err());
    }
}
