use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

use medimart_core::generate_id;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

// Ensures each request has an X-Request-Id and mirrors it on the response
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let header_name = HeaderName::from_static(REQUEST_ID_HEADER);

    // If the incoming request already has a request-id, preserve it; otherwise generate one
    let req_id_value = match req.headers().get(&header_name) {
        Some(v) => v.clone(),
        None => match HeaderValue::from_str(&generate_id()) {
            Ok(v) => v,
            Err(_) => return next.run(req).await,
        },
    };

    // Add to request extensions for downstream usage (e.g., logging)
    req.extensions_mut().insert(req_id_value.clone());

    let mut res = next.run(req).await;
    res.headers_mut().insert(header_name, req_id_value);
    res
}

// Records request count and latency, labelled by the matched route when there is one
pub async fn http_metrics(req: Request<Body>, next: Next) -> Response {
    let method = req.method().as_str().to_owned();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());
    let started = Instant::now();

    let res = next.run(req).await;

    crate::metrics::record_http_request(&method, &path, res.status().as_u16(), started.elapsed());
    res
}
