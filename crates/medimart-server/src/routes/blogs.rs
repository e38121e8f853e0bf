//! Health blog posts, hand-written or generated.

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use medimart_api::{ApiError, ApiJson, ApiQuery, ApiResult};
use medimart_core::models::AiBlog;
use medimart_core::validation;
use medimart_storage::{FindQuery, Repository};
use serde::Deserialize;
use serde_json::Value;

use super::{Deleted, create_document, delete_document, get_document, parse_model};
use crate::metrics;
use crate::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate_blog))
        .route("/", post(create_blog).get(list_blogs))
        .route("/{id}", get(get_blog).delete(delete_blog))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            out.push(tag.to_string());
        }
    }
    out
}

async fn generate_blog(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<GenerateRequest>,
) -> ApiResult<(StatusCode, ApiJson<AiBlog>)> {
    validation::require("topic", &req.topic)?;
    let topic = req.topic.trim().to_string();
    let generator = state.blog_generator.as_ref();

    let post = generator.generate(&topic).await.map_err(|e| {
        tracing::error!(topic = %topic, source = generator.source(), error = %e, "blog generation failed");
        ApiError::bad_gateway(format!("blog generation failed: {e}"))
    })?;

    let blog = AiBlog {
        title: post.title,
        content: post.content,
        topic,
        author_id: req.author_id.filter(|a| !a.trim().is_empty()),
        tags: clean_tags(req.tags),
        generated: true,
        ..Default::default()
    };
    let (status, ApiJson(blog)) = create_document(state.storage(), blog).await?;
    metrics::record_blog_generated(generator.source());
    tracing::info!(blog_id = %blog.meta.id, source = generator.source(), "blog generated");
    Ok((status, ApiJson(blog)))
}

async fn create_blog(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<(StatusCode, ApiJson<AiBlog>)> {
    let mut blog: AiBlog = parse_model(body)?;
    blog.generated = false;
    blog.tags = clean_tags(blog.tags);
    create_document(state.storage(), blog).await
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogFilter {
    pub author_id: Option<String>,
    pub tag: Option<String>,
}

async fn list_blogs(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<BlogFilter>,
) -> ApiResult<ApiJson<Vec<AiBlog>>> {
    let author = filter.author_id.filter(|a| !a.trim().is_empty());
    let query = FindQuery::new().eq_opt("authorId", author).newest_first();
    let mut blogs = Repository::<AiBlog>::new(state.storage())
        .find(&query)
        .await?;
    if let Some(tag) = filter.tag.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        blogs.retain(|b| b.has_tag(tag));
    }
    Ok(ApiJson(blogs))
}

async fn get_blog(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiJson<AiBlog>> {
    Ok(ApiJson(get_document(state.storage(), &id).await?))
}

async fn delete_blog(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiJson<Deleted>> {
    Ok(ApiJson(delete_document::<AiBlog>(state.storage(), &id).await?))
}
