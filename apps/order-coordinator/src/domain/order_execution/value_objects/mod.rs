//! Order Execution Value Objects

mod anomaly;
mod gateway_event;
mod order_pricing;
mod order_side;
mod order_status;

pub use anomaly::{AnomalyKind, OrderAnomaly};
pub use gateway_event::{GatewayOrderEvent, OrderEventKind};
pub use order_pricing::OrderPricing;
pub use order_side::OrderSide;
pub use order_status::OrderStatus;
