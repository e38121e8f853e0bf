//! Prometheus metrics for the MediMart server.
//!
//! This module provides:
//! - HTTP request metrics (count, latency)
//! - Marketplace counters (bookings created, orders placed, blogs generated)

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

    // Marketplace metrics
    pub const BOOKINGS_CREATED_TOTAL: &str = "medimart_bookings_created_total";
    pub const ORDERS_PLACED_TOTAL: &str = "medimart_orders_placed_total";
    pub const ORDER_ITEMS_TOTAL: &str = "medimart_order_items_total";
    pub const BLOGS_GENERATED_TOTAL: &str = "medimart_blogs_generated_total";
    pub const PAYMENTS_RECORDED_TOTAL: &str = "medimart_payments_recorded_total";
}

/// Initialize the Prometheus metrics exporter.
///
/// This should be called once at server startup.
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        tracing::debug!("Prometheus metrics already initialized");
        return false;
    }

    // Pull-based: /metrics renders the handle itself
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_err() {
                tracing::warn!("Failed to store Prometheus handle (already set)");
                return false;
            }

            tracing::info!("Prometheus metrics initialized");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus recorder");
            false
        }
    }
}

/// Render all metrics in Prometheus text format.
///
/// Returns `None` if metrics were not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|handle| handle.render())
}

// =============================================================================
// HTTP Metrics
// =============================================================================

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let status_class = match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    };

    // Normalize path to avoid high cardinality
    let normalized_path = normalize_path(path);

    counter!(
        names::HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "path" => normalized_path.clone(),
        "status" => status.to_string(),
        "status_class" => status_class.to_string()
    )
    .increment(1);

    histogram!(
        names::HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "path" => normalized_path
    )
    .record(duration.as_secs_f64());
}

// =============================================================================
// Marketplace Metrics
// =============================================================================

pub fn record_booking_created() {
    counter!(names::BOOKINGS_CREATED_TOTAL).increment(1);
}

pub fn record_order_placed(items: usize) {
    counter!(names::ORDERS_PLACED_TOTAL).increment(1);
    counter!(names::ORDER_ITEMS_TOTAL).increment(items as u64);
}

/// `source` is `remote` or `template`.
pub fn record_blog_generated(source: &'static str) {
    counter!(names::BLOGS_GENERATED_TOTAL, "source" => source).increment(1);
}

/// `purpose` is `booking` or `order`.
pub fn record_payment(purpose: &'static str) {
    counter!(names::PAYMENTS_RECORDED_TOTAL, "purpose" => purpose).increment(1);
}

// =============================================================================
// Path normalization
// =============================================================================

/// Replaces id-like segments with `{id}` so label cardinality stays bounded.
pub fn normalize_path(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_string();
    }
    // Uploaded file names are unbounded too
    if path.starts_with("/uploads/") {
        return "/uploads/{file}".to_string();
    }

    let normalized: Vec<&str> = path
        .split('/')
        .map(|segment| if is_likely_id(segment) { "{id}" } else { segment })
        .collect();
    normalized.join("/")
}

/// Check if a path segment looks like a document id.
fn is_likely_id(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }

    // Numeric ids
    if s.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }

    // UUID format
    if s.len() == 36 && s.chars().filter(|c| *c == '-').count() == 4 {
        return true;
    }

    // Long alphanumeric with digits (route words like `prescriptions` have none)
    if s.len() > 12
        && s.chars().any(|c| c.is_ascii_digit())
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path("/api/bookings/550e8400-e29b-41d4-a716-446655440000/status"),
            "/api/bookings/{id}/status"
        );
        assert_eq!(normalize_path("/api/patients/42"), "/api/patients/{id}");
        assert_eq!(normalize_path("/api/doctors/all-data"), "/api/doctors/all-data");
        assert_eq!(normalize_path("/uploads/a1b2.png"), "/uploads/{file}");
        assert_eq!(normalize_path("/"), "/");
    }

    #[test]
    fn test_is_likely_id() {
        assert!(is_likely_id("12345"));
        assert!(is_likely_id("550e8400-e29b-41d4-a716-446655440000"));
        assert!(is_likely_id("retailer_0001_alpha"));
        assert!(!is_likely_id("diet-yoga"));
        assert!(!is_likely_id(""));
        assert!(!is_likely_id("read-all"));
        assert!(!is_likely_id("prescriptions"));
    }
}
