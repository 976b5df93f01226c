//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): requests by method, status
//! - `relay_request_duration_seconds` (histogram): time to response headers
//! - `relay_deliveries_total` (counter): responses by delivery strategy
//! - `relay_cache_writes_total` (counter): cache writes by outcome
//! - `relay_cache_lookups_total` (counter): cache reads by hit/miss
//!
//! Recording is a no-op until `init_metrics` installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "relay_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("relay_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// `strategy` is an `x-provider` value or "directDownload".
pub fn record_delivery(strategy: &'static str) {
    metrics::counter!("relay_deliveries_total", "provider" => strategy).increment(1);
}

pub fn record_cache_write(outcome: &'static str) {
    metrics::counter!("relay_cache_writes_total", "outcome" => outcome).increment(1);
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    metrics::counter!("relay_cache_lookups_total", "result" => result).increment(1);
}
