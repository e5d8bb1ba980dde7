//! Metric descriptions and the optional Prometheus exporter

use std::net::SocketAddr;

use anyhow::Context;
use latchkey_consistency::expiration::{LOCKS_EXPIRED, PRESENCE_EXPIRED};
use latchkey_core::service::metrics_notifier::{ACTIVE_LOCKS, ACTIVE_PRESENCES};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Register descriptions for every metric the server emits
pub fn init_metrics() {
    describe_gauge!(ACTIVE_LOCKS, "Number of unexpired locks");
    describe_gauge!(ACTIVE_PRESENCES, "Number of unexpired presences");
    describe_counter!(LOCKS_EXPIRED, "Locks released because their TTL ran out");
    describe_counter!(PRESENCE_EXPIRED, "Presences released because their TTL ran out");
}

/// Serve `/metrics` in Prometheus text format on `listen_address`
pub fn install_prometheus_exporter(listen_address: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(listen_address)
        .install()
        .with_context(|| format!("failed to start metrics exporter on {}", listen_address))
}
