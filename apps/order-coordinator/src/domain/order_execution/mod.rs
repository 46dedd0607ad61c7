//! Order Execution Bounded Context
//!
//! Order aggregate, lifecycle state machine and gateway order events.

pub mod aggregate;
pub mod errors;
pub mod services;
pub mod value_objects;

pub use aggregate::{FillOutcome, NewOrder, Order, RecoveredOrder};
pub use errors::OrderError;
pub use services::OrderStateMachine;
pub use value_objects::{
    AnomalyKind, GatewayOrderEvent, OrderAnomaly, OrderEventKind, OrderPricing, OrderSide,
    OrderStatus,
};
