//! Client-side request metrics.
//!
//! # Metrics
//! - `grievance_client_attempts_total` (counter): attempts by operation, status
//! - `grievance_client_retries_total` (counter): backoff retries by operation
//! - `grievance_client_transport_errors_total` (counter): attempts with no response
//! - `grievance_client_sessions_expired_total` (counter): credentials dropped on 401
//!
//! Recorded through the `metrics` facade; the embedding application decides
//! whether a recorder/exporter is installed.

pub fn record_attempt(operation: &str, status: u16) {
    metrics::counter!(
        "grievance_client_attempts_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_retry(operation: &str) {
    metrics::counter!("grievance_client_retries_total", "operation" => operation.to_string())
        .increment(1);
}

pub fn record_transport_error(operation: &str) {
    metrics::counter!(
        "grievance_client_transport_errors_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}

pub fn record_session_expired() {
    metrics::counter!("grievance_client_sessions_expired_total").increment(1);
}
