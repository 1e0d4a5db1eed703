//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): screened requests by verdict, status
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_backend_health` (gauge): 1=healthy, 0=unhealthy, per backend
//! - `gateway_blocked_ips` (gauge): entries in the blocklist
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(verdict: &'static str, status: u16, start: Instant) {
    ::metrics::counter!(
        "gateway_requests_total",
        "verdict" => verdict,
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("gateway_request_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}

pub fn record_backend_health(backend: &str, healthy: bool) {
    ::metrics::gauge!("gateway_backend_health", "backend" => backend.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_blocked_ips(count: usize) {
    ::metrics::gauge!("gateway_blocked_ips").set(count as f64);
}
