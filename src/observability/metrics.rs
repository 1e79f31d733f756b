//! Metrics collection and exposition.
//!
//! # Metrics
//! - `faucet_enqueued_total` (counter): items pushed, by priority
//! - `faucet_outcomes_total` (counter): worker results, by outcome
//! - `faucet_queue_depth` (gauge): items waiting
//! - `faucet_rpc_failover_total` (counter): switches to a fallback, by url
//! - `faucet_rpc_endpoint_healthy` (gauge): 1=reachable, 0=unreachable, by url
//! - `faucet_rate_limited_total` (counter): rejections, by key kind
//! - `faucet_http_requests_total` (counter): by route, status
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with an HTTP scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_enqueued(priority: i32) {
    ::metrics::counter!("faucet_enqueued_total", "priority" => priority.to_string()).increment(1);
}

pub fn record_outcome(outcome: &'static str) {
    ::metrics::counter!("faucet_outcomes_total", "outcome" => outcome).increment(1);
}

pub fn set_queue_depth(depth: usize) {
    ::metrics::gauge!("faucet_queue_depth").set(depth as f64);
}

pub fn record_failover(url: &str) {
    ::metrics::counter!("faucet_rpc_failover_total", "url" => url.to_string()).increment(1);
}

pub fn record_endpoint_health(url: &str, healthy: bool) {
    ::metrics::gauge!("faucet_rpc_endpoint_healthy", "url" => url.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_rate_limited(kind: &'static str) {
    ::metrics::counter!("faucet_rate_limited_total", "kind" => kind).increment(1);
}

pub fn record_http_request(route: String, status: u16) {
    ::metrics::counter!(
        "faucet_http_requests_total",
        "route" => route,
        "status" => status.to_string()
    )
    .increment(1);
}
