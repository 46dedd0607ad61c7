//! Futu Gateway Adapter
//!
//! Talks to the local gateway bridge over a line-delimited JSON protocol:
//!
//! - [`codec`]: frame types and the tokio codec
//! - [`connection_manager`]: session supervision, request correlation
//! - [`heartbeat`] / [`reconnect`]: liveness and backoff
//! - [`adapter`]: the `GatewayPort` implementation
//! - [`probe`]: startup reachability check

pub mod adapter;
pub mod codec;
pub mod connection_manager;
pub mod heartbeat;
pub mod probe;
pub mod reconnect;

pub use adapter::FutuGateway;
pub use connection_manager::ConnectionManager;
pub use probe::{PROBE_TIMEOUT, probe_gateway};
