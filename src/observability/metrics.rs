//! Metrics collection and exposition.
//!
//! # Metrics
//! - `telemetry_batches_total` (counter): flush attempts by outcome
//! - `telemetry_realtime_samples_total` (counter): block samples by outcome
//! - `telemetry_secondary_transfers_total` (counter): fallback writes by pipeline, outcome
//! - `telemetry_queue_depth` (gauge): collector lines waiting to be flushed
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - The Prometheus endpoint is opt-in

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Prometheus metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

fn outcome(success: bool) -> &'static str {
    if success {
        "delivered"
    } else {
        "failed"
    }
}

/// Record a batch delivery attempt.
pub fn record_batch(delivered: bool, lines: usize) {
    metrics::counter!("telemetry_batches_total", "outcome" => outcome(delivered)).increment(1);
    if delivered {
        metrics::counter!("telemetry_batch_lines_total").increment(lines as u64);
    }
}

/// Record what happened to one real-time sample.
///
/// `result` is `"delivered"`, `"failed"` or `"dropped"` (never built).
pub fn record_realtime_sample(result: &'static str) {
    metrics::counter!("telemetry_realtime_samples_total", "outcome" => result).increment(1);
}

/// Record a secondary channel transfer.
pub fn record_secondary_transfer(pipeline: &'static str, delivered: bool) {
    metrics::counter!(
        "telemetry_secondary_transfers_total",
        "pipeline" => pipeline,
        "outcome" => outcome(delivered)
    )
    .increment(1);
}

/// Record the current collector queue depth.
pub fn record_queue_depth(depth: usize) {
    metrics::gauge!("telemetry_queue_depth").set(depth as f64);
}

/// Record a subscription (re)connect attempt.
pub fn record_subscription_connect(success: bool) {
    let outcome = if success { "open" } else { "failed" };
    metrics::counter!("telemetry_subscription_connects_total", "outcome" => outcome).increment(1);
}
