//! Metrics collection and exposition.
//!
//! # Metrics
//! - `fleet_status_collections_total` (counter): collector cycles by collector, outcome
//! - `fleet_status_collection_duration_seconds` (histogram): cycle latency by collector
//! - `fleet_status_resource_status_total` (counter): computed statuses by kind, base
//! - `fleet_status_agent_reports_total` (counter): agent pushes by outcome
//! - `fleet_status_tracked_resources` (gauge): records held in the store
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter, so the
//! engine and tests never depend on it.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::status::AggregateStatus;

/// Install the Prometheus exporter with its own scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_collection(collector: &'static str, outcome: &'static str, elapsed: Duration) {
    counter!("fleet_status_collections_total", "collector" => collector, "outcome" => outcome)
        .increment(1);
    histogram!("fleet_status_collection_duration_seconds", "collector" => collector)
        .record(elapsed.as_secs_f64());
}

pub fn record_resource_status(kind: &'static str, status: &AggregateStatus) {
    counter!(
        "fleet_status_resource_status_total",
        "kind" => kind,
        "base" => status.base().as_str()
    )
    .increment(1);
}

pub fn record_agent_report(outcome: &'static str) {
    counter!("fleet_status_agent_reports_total", "outcome" => outcome).increment(1);
}

pub fn record_tracked_resources(count: usize) {
    gauge!("fleet_status_tracked_resources").set(count as f64);
}
