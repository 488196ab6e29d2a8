//! Operational metrics about the exporter itself.
//!
//! # Metrics
//! - `balance_exporter_poll_cycles_total` (counter): cycles by outcome
//! - `balance_exporter_rpc_requests_total` (counter): balance queries by network, result
//! - `balance_exporter_poll_cycle_duration_seconds` (histogram): cycle latency
//!
//! These go through the `metrics` facade and are appended to the balance
//! dump on `/metrics` when a Prometheus recorder is installed. Without a
//! recorder every call is a no-op.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to install metrics recorder: {0}")]
    Recorder(String),
}

/// Install the global Prometheus recorder and return its render handle.
pub fn init_metrics() -> Result<PrometheusHandle, TelemetryError> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| TelemetryError::Recorder(e.to_string()))
}

/// Record a finished or skipped poll cycle.
pub fn record_cycle(outcome: &'static str, start: Instant) {
    counter!("balance_exporter_poll_cycles_total", "outcome" => outcome).increment(1);
    histogram!("balance_exporter_poll_cycle_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}

/// Record one balance query against `network`.
pub fn record_rpc(network: &str, ok: bool) {
    let result = if ok { "ok" } else { "error" };
    counter!(
        "balance_exporter_rpc_requests_total",
        "network_name" => network.to_string(),
        "result" => result
    )
    .increment(1);
}
