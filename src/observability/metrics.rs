//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_connections_total` (counter): accepted connections
//! - `gateway_accept_errors_total` (counter): failed accept calls
//! - `gateway_active_connections` (gauge): live sessions
//! - `gateway_responses_total` (counter): responses written, by outcome
//! - `gateway_request_duration_seconds` (histogram): read-to-write latency
//!
//! Recording is a no-op until a recorder is installed, so library users and
//! tests that never call [`init_metrics`] pay nothing.

use ::metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_connection_accepted() {
    counter!("gateway_connections_total").increment(1);
}

pub fn record_accept_error() {
    counter!("gateway_accept_errors_total").increment(1);
}

pub fn record_active_connections(count: usize) {
    gauge!("gateway_active_connections").set(count as f64);
}

/// Record one response written to a client.
pub fn record_response(outcome: &'static str, started: Instant) {
    counter!("gateway_responses_total", "outcome" => outcome).increment(1);
    histogram!("gateway_request_duration_seconds", "outcome" => outcome)
        .record(started.elapsed().as_secs_f64());
}
