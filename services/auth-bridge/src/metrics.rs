//! Prometheus metrics exposition
//!
//! - `auth_requests_total` (counter): labels `flow`, `status`
//! - `auth_request_duration_seconds` (histogram): label `status`
//! - `auth_provider_errors_total` (counter): label `error_type`

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

const DURATION_METRIC: &str = "auth_request_duration_seconds";

/// Bucket boundaries from 5ms up to the default provider timeout.
const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

fn builder() -> PrometheusBuilder {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(DURATION_METRIC.to_string()), DURATION_BUCKETS)
        .expect("failed to set histogram buckets")
}

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// The duration histogram gets explicit buckets so it renders `_bucket` lines
/// rather than a summary.
pub fn install_recorder() -> PrometheusHandle {
    builder()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Record a handled auth request. `flow` is `password`, `refresh` or `none`.
pub fn record_request(flow: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!("auth_requests_total", "flow" => flow.to_string(), "status" => status_str.clone())
        .increment(1);
    metrics::histogram!(DURATION_METRIC, "status" => status_str).record(duration_secs);
}

/// Record a failed provider call by error kind.
pub fn record_provider_error(error_type: &str) {
    metrics::counter!("auth_provider_errors_total", "error_type" => error_type.to_string())
        .increment(1);
}
