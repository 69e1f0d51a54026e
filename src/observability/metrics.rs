//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): requests by terminal outcome
//! - `dispatch_request_duration_seconds` (histogram): time to a terminal state
//! - `dispatch_table_refreshes_total` (counter): rebuilds by result
//! - `dispatch_route_table_size` (gauge): routes in the installed table
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until a
//!   recorder is installed
//! - The Prometheus exporter serves its own listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::dispatch::DispatchState;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one finished dispatch.
pub fn record_dispatch(outcome: DispatchState, started: Instant) {
    metrics::counter!("dispatch_requests_total", "outcome" => outcome.as_str()).increment(1);
    metrics::histogram!("dispatch_request_duration_seconds")
        .record(started.elapsed().as_secs_f64());
}

/// Record a table rebuild attempt.
pub fn record_table_refresh(result: &'static str, routes: usize) {
    metrics::counter!("dispatch_table_refreshes_total", "result" => result).increment(1);
    metrics::gauge!("dispatch_route_table_size").set(routes as f64);
}
