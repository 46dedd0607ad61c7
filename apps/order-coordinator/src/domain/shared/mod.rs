//! Shared Domain Types

mod identifiers;

pub use identifiers::{GatewayOrderId, OrderId};
