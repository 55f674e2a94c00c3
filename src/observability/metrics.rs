//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define proxy metrics (requests, latency, cache lookups, origin fetches)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, outcome
//! - `proxy_request_duration_seconds` (histogram): latency by outcome
//! - `proxy_cache_lookups_total` (counter): GET lookups by result (hit/miss)
//! - `proxy_origin_fetches_total` (counter): origin fetches by result
//! - `proxy_origin_response_bytes` (histogram): size of fetched responses
//! - `proxy_sessions_dropped_total` (counter): sessions closed without a response
//!
//! # Design Decisions
//! - Without an installed recorder every call is a no-op
//! - Labels stay low-cardinality (no hosts or paths)

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder with an HTTP scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed session that produced a response.
pub fn record_request(method: &str, status: u16, outcome: &'static str, start: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("proxy_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_origin_fetch(bytes: Option<usize>) {
    match bytes {
        Some(len) => {
            counter!("proxy_origin_fetches_total", "result" => "ok").increment(1);
            histogram!("proxy_origin_response_bytes").record(len as f64);
        }
        None => counter!("proxy_origin_fetches_total", "result" => "error").increment(1),
    }
}

pub fn record_session_dropped(reason: &'static str) {
    counter!("proxy_sessions_dropped_total", "reason" => reason).increment(1);
}
