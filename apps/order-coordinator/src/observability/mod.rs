//! Observability module for metrics.
//!
//! Counters are recorded through the `metrics` facade and exported by the
//! Prometheus listener when one is installed. Without an installed recorder
//! every call is a no-op, which keeps tests free of global state.

mod metrics;

pub use metrics::{
    MetricsConfig, MetricsError, init_metrics, record_gateway_event, record_gateway_reconnect,
    record_order_anomaly, record_order_intent, record_quote_update,
};
