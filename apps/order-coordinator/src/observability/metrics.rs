//! Prometheus metrics for the order coordinator.
//!
//! # Example
//!
//! ```ignore
//! use order_coordinator::observability::{init_metrics, MetricsConfig};
//!
//! let config = MetricsConfig::with_addr("127.0.0.1:9464".parse()?);
//! init_metrics(&config)?;
//!
//! record_order_intent("accepted");
//! ```

use std::net::SocketAddr;

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
}

impl MetricsConfig {
    /// Create a metrics configuration bound to `addr`.
    #[must_use]
    pub const fn with_addr(addr: SocketAddr) -> Self {
        Self { listen_addr: addr }
    }
}

/// Initialize the Prometheus metrics exporter.
///
/// This starts an HTTP listener that exposes metrics at `/metrics`.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(
        addr = %config.listen_addr,
        "Prometheus metrics exporter started"
    );

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

/// Record a quote cache update (`accepted` or `out_of_order`).
pub fn record_quote_update(outcome: &'static str) {
    counter!("quote_updates_total", "outcome" => outcome).increment(1);
}

/// Record the outcome of an order intent (`accepted` or an error code).
pub fn record_order_intent(outcome: &'static str) {
    counter!("order_intents_total", "outcome" => outcome).increment(1);
}

/// Record how a gateway order event was handled.
pub fn record_gateway_event(outcome: &'static str) {
    counter!("gateway_events_total", "outcome" => outcome).increment(1);
}

/// Record an order anomaly.
pub fn record_order_anomaly(kind: &'static str) {
    counter!("order_anomalies_total", "kind" => kind).increment(1);
}

/// Record a gateway reconnect attempt.
pub fn record_gateway_reconnect() {
    counter!("gateway_reconnects_total").increment(1);
}
