//! Metrics collection and exposition.
//!
//! # Metrics
//! - `emulator_invocations_total` (counter): invocations by function, outcome
//! - `emulator_invocation_duration_seconds` (histogram): handler latency
//! - `emulator_cache_lookups_total` (counter): lookups by result (hit/miss)
//! - `emulator_cached_routes` (gauge): routes with a live cache
//! - `emulator_reloads_total` (counter): reloads by outcome
//! - `emulator_requests_total` (counter): requests by method, status
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_invocation(function: &str, outcome: &'static str, start: Instant) {
    counter!(
        "emulator_invocations_total",
        "function" => function.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("emulator_invocation_duration_seconds", "function" => function.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("emulator_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_cache_routes(count: usize) {
    gauge!("emulator_cached_routes").set(count as f64);
}

pub fn record_reload(outcome: &'static str) {
    counter!("emulator_reloads_total", "outcome" => outcome).increment(1);
}

pub fn record_request(method: &str, status: u16) {
    counter!(
        "emulator_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
