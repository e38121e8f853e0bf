use axum::{
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde_json::json;

use crate::server::AppState;

pub async fn root(State(state): State<AppState>) -> impl IntoResponse {
    axum::Json(json!({
        "service": "medimart",
        "version": env!("CARGO_PKG_VERSION"),
        "storage": state.storage().backend_name(),
        "baseUrl": state.config.base_url(),
    }))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, axum::Json(json!({"status": "ok"})))
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    match state.storage().ping().await {
        Ok(()) => (StatusCode::OK, axum::Json(json!({"status": "ready"}))),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                axum::Json(json!({"status": "unavailable", "message": e.to_string()})),
            )
        }
    }
}

pub async fn metrics() -> impl IntoResponse {
    match crate::metrics::render_metrics() {
        Some(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            "metrics recorder not installed\n".to_string(),
        ),
    }
}
