//! Prometheus metrics exposition
//!
//! Counters exposed on `GET /metrics`:
//!
//! - `sso_requests_total` (counter): label `endpoint`
//! - `sso_request_failures_total` (counter): label `status`
//! - `sso_upstream_errors_total` (counter): label `kind`

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// The handle's `render()` method produces the Prometheus text exposition
/// format suitable for serving on a `/metrics` endpoint.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Count an inbound request by endpoint.
pub fn record_request(endpoint: &'static str) {
    metrics::counter!("sso_requests_total", "endpoint" => endpoint).increment(1);
}

/// Count a failed request by response status.
pub fn record_failure(status: u16) {
    metrics::counter!("sso_request_failures_total", "status" => status.to_string()).increment(1);
}

/// Count an authority-call failure with a classification label.
pub fn record_upstream_error(kind: &'static str) {
    metrics::counter!("sso_upstream_errors_total", "kind" => kind.to_string()).increment(1);
}
