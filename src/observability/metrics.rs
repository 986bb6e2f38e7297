//! Metrics collection and exposition.
//!
//! # Metrics
//! - `graphql_requests_total` (counter): requests by method, status, response mode
//! - `graphql_request_duration_seconds` (histogram): latency distribution
//! - `graphql_errors_total` (counter): GraphQL errors returned by the engine
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests need no setup
//! - The Prometheus exporter runs its own listener, separate from the GraphQL port

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and start its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, mode: &'static str, start: Instant) {
    let status = status.to_string();
    metrics::counter!(
        "graphql_requests_total",
        "method" => method.to_string(),
        "status" => status.clone(),
        "mode" => mode
    )
    .increment(1);
    metrics::histogram!(
        "graphql_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status,
        "mode" => mode
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_errors(count: usize) {
    metrics::counter!("graphql_errors_total").increment(count as u64);
}
