//! Gateway Port (Driven Port)
//!
//! Interface for interacting with the brokerage gateway for order execution,
//! account data and quotes.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::account::AccountSnapshot;
use crate::domain::environment::TradeEnvironment;
use crate::domain::instrument::{Instrument, InstrumentCode, Market};
use crate::domain::market_data::{DepthSnapshot, QuoteSnapshot};
use crate::domain::order_execution::{GatewayOrderEvent, OrderPricing, OrderSide, OrderStatus};
use crate::domain::session::SessionState;
use crate::domain::shared::{GatewayOrderId, OrderId};

/// Request to place an order with the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    /// Local order id, echoed back by the gateway as the client reference.
    pub client_order_id: OrderId,
    /// Instrument.
    pub code: InstrumentCode,
    /// Side.
    pub side: OrderSide,
    /// Quantity.
    pub quantity: Decimal,
    /// Market or limit.
    pub pricing: OrderPricing,
    /// Trading environment the order is placed in.
    pub environment: TradeEnvironment,
    /// Allow pre/post-market execution.
    pub extended_hours: bool,
}

/// Acknowledgment from the gateway after order placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrderAck {
    /// Gateway-assigned order id.
    pub gateway_order_id: GatewayOrderId,
    /// Client order id echoed back.
    pub client_order_id: OrderId,
}

/// Request to cancel an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrderRequest {
    /// Gateway order id.
    pub gateway_order_id: GatewayOrderId,
    /// Instrument, which selects the trading market.
    pub code: InstrumentCode,
    /// Trading environment.
    pub environment: TradeEnvironment,
}

/// One order from the gateway's order list.
///
/// The list covers the current trading day, so finished orders appear with
/// a terminal status next to open ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrderReport {
    /// Gateway order id.
    pub gateway_order_id: GatewayOrderId,
    /// Client reference, when the order was placed by this coordinator.
    #[serde(default)]
    pub client_order_id: Option<OrderId>,
    /// Instrument.
    pub code: InstrumentCode,
    /// Side.
    pub side: OrderSide,
    /// Order quantity.
    pub quantity: Decimal,
    /// Market or limit.
    pub pricing: OrderPricing,
    /// Cumulative dealt quantity.
    pub dealt_quantity: Decimal,
    /// Average dealt price.
    #[serde(default)]
    pub dealt_average_price: Option<Decimal>,
    /// Gateway status.
    pub status: OrderStatus,
    /// Environment the order lives in.
    pub environment: TradeEnvironment,
    /// Creation time at the gateway.
    pub created_at: DateTime<Utc>,
}

impl GatewayOrderReport {
    /// Returns true if the gateway still works the order.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// Unsolicited message pushed by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum GatewayPush {
    /// Order lifecycle event.
    Order(GatewayOrderEvent),
    /// Quote update.
    Quote(QuoteSnapshot),
}

/// Gateway port error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Could not reach the gateway within the connect timeout.
    #[error("gateway connection failed: {0}")]
    Connection(String),

    /// Session is not connected.
    #[error("gateway session is {state}")]
    Unavailable {
        /// Session state when the request was attempted.
        state: SessionState,
    },

    /// Transport failed after the request may have been written.
    #[error("transient gateway failure: {0}")]
    Transient(String),

    /// No response within the request timeout.
    #[error("gateway request timed out after {0:?}")]
    Timeout(Duration),

    /// Gateway refused the request.
    #[error("gateway rejected the request: {0}")]
    Rejected(String),

    /// Gateway does not know the instrument.
    #[error("unknown instrument {0}")]
    UnknownInstrument(String),

    /// Reply could not be decoded.
    #[error("gateway protocol error: {0}")]
    Protocol(String),
}

impl GatewayError {
    /// Whether the failure is transient and the request may be retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Unavailable { .. } | Self::Transient(_) | Self::Timeout(_)
        )
    }

    /// Whether the request may have reached the gateway despite the error.
    ///
    /// An undecodable reply still means the request arrived.
    #[must_use]
    pub const fn possibly_delivered(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout(_) | Self::Protocol(_))
    }
}

/// Port for the brokerage gateway.
#[async_trait]
pub trait GatewayPort: Send + Sync {
    /// Current session state.
    fn session_state(&self) -> SessionState;

    /// Place an order. Placing twice with the same client id must not
    /// create two orders.
    async fn place_order(&self, request: PlaceOrderRequest)
    -> Result<PlaceOrderAck, GatewayError>;

    /// Request cancellation. Completion arrives as an order event.
    async fn cancel_order(&self, request: CancelOrderRequest) -> Result<(), GatewayError>;

    /// Today's orders in `environment`.
    async fn open_orders(
        &self,
        environment: TradeEnvironment,
    ) -> Result<Vec<GatewayOrderReport>, GatewayError>;

    /// Fresh account snapshot.
    async fn account_snapshot(
        &self,
        environment: TradeEnvironment,
        market: Market,
    ) -> Result<AccountSnapshot, GatewayError>;

    /// Latest quote.
    async fn quote(&self, code: InstrumentCode) -> Result<QuoteSnapshot, GatewayError>;

    /// Up to `depth` bid and ask levels.
    async fn order_book(
        &self,
        code: InstrumentCode,
        depth: usize,
    ) -> Result<DepthSnapshot, GatewayError>;

    /// Static instrument data (lot size, tick size, name).
    async fn resolve_instrument(&self, code: InstrumentCode) -> Result<Instrument, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_failures_are_retryable() {
        assert!(GatewayError::Connection("refused".into()).is_retryable());
        assert!(GatewayError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!GatewayError::Rejected("bad lot".into()).is_retryable());
        assert!(!GatewayError::Protocol("eof".into()).is_retryable());
    }

    #[test]
    fn unavailable_is_never_delivered() {
        let err = GatewayError::Unavailable {
            state: SessionState::Disconnected,
        };
        assert!(!err.possibly_delivered());
        assert!(GatewayError::Transient("reset".into()).possibly_delivered());
    }
}
