//! Metrics collection and exposition.
//!
//! # Metrics
//! - `blog_http_requests_total` (counter): requests by method, status
//! - `blog_storage_mode` (gauge): 1=database, 0=memory
//! - `blog_storage_mode_switches_total` (counter): durable → degraded transitions
//! - `blog_storage_errors_total` (counter): backend faults by backend, operation
//! - `blog_connection_state` (gauge): raw database connection state code

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::health::connection::ConnectionState;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            gauge!("blog_storage_mode").set(1.0);
            tracing::info!(address = %addr, "Metrics endpoint listening");
        }
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16) {
    counter!(
        "blog_http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_mode_switch() {
    counter!("blog_storage_mode_switches_total").increment(1);
    gauge!("blog_storage_mode").set(0.0);
}

pub fn record_storage_error(backend: &'static str, operation: &'static str) {
    counter!(
        "blog_storage_errors_total",
        "backend" => backend,
        "operation" => operation
    )
    .increment(1);
}

pub fn record_connection_state(state: ConnectionState) {
    gauge!("blog_connection_state").set(f64::from(state.code()));
}
