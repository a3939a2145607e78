//! Metrics definitions for the drinks service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `drinks_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: 6 values (parameterized paths plus "/other")
//! - `status`: 3 values (success, error, timeout)
//! - `code`: bounded by `DrinksError::code`
//! - `operation`: bounded by the `DrinkStore` methods

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder and return the handle serving `/metrics`.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("drinks_http_request_duration_seconds".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.500, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP duration buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Full("drinks_store_operation_duration_seconds".to_string()),
            &[0.001, 0.002, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 1.000],
        )
        .map_err(|e| format!("Failed to set store duration buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `drinks_http_requests_total`, `drinks_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("drinks_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("drinks_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Collapse drink ids so each route is one label value.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/metrics" => "/metrics",
        "/drinks" => "/drinks",
        "/drinks-detail" => "/drinks-detail",
        _ => match path.strip_prefix("/drinks/") {
            Some(id) if !id.is_empty() && !id.contains('/') => "/drinks/{id}",
            _ => "/other",
        },
    }
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Record a rejected request.
///
/// Metric: `drinks_auth_failures_total`
/// Labels: `code`
pub fn record_auth_failure(code: &'static str) {
    counter!("drinks_auth_failures_total", "code" => code).increment(1);
}

// ============================================================================
// Store Metrics
// ============================================================================

/// Record a drink store call.
///
/// Metric: `drinks_store_operations_total`, `drinks_store_operation_duration_seconds`
/// Labels: `operation`, `status`
pub fn record_store_operation(operation: &'static str, status: &'static str, duration: Duration) {
    histogram!("drinks_store_operation_duration_seconds",
        "operation" => operation
    )
    .record(duration.as_secs_f64());

    counter!("drinks_store_operations_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
}
