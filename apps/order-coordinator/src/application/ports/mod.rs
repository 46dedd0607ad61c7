//! Application Ports (Driven)
//!
//! Ports define how the coordinator uses the brokerage gateway. The
//! infrastructure layer provides the adapter; tests provide stubs.

mod gateway_port;

pub use gateway_port::{
    CancelOrderRequest, GatewayError, GatewayOrderReport, GatewayPort, GatewayPush,
    PlaceOrderAck, PlaceOrderRequest,
};
