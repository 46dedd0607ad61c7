//! Coordinator error taxonomy.
//!
//! Every rejection carries a stable [`ErrorCode`] naming the rule that was
//! violated. Connection-class errors are retryable; business-rule errors
//! are not and must be surfaced to the agent as a rejected intent.
//!
//! | Code | Retryable | Meaning |
//! |------|-----------|---------|
//! | `CONNECTION_ERROR` | yes | Gateway unreachable within the connect timeout |
//! | `GATEWAY_UNAVAILABLE` | yes | Session not connected |
//! | `TRANSIENT_GATEWAY_ERROR` | yes | Transport failure or timeout |
//! | `ENVIRONMENT_MISMATCH` | no | Intent environment differs from the process environment |
//! | `PRICE_SANITY` | no | Limit price outside the band, or no usable quote |
//! | `MARKET_CLOSED` | no | Outside trading hours |
//! | `INVALID_STATE` | no | Operation not allowed in the order's state |
//! | `INSUFFICIENT_BUYING_POWER` | no | Buy exceeds buying power |
//! | `INSUFFICIENT_POSITION` | no | Sell exceeds sellable quantity |
//! | `INVALID_INTENT` | no | Malformed instrument, quantity or price |
//! | `ORDER_NOT_FOUND` | no | Unknown order id |
//! | `GATEWAY_REJECTED` | no | Gateway refused the request |
//! | `GATEWAY_PROTOCOL_ERROR` | no | Gateway reply could not be understood |

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::ports::GatewayError;
use crate::application::retry::RetryFailure;
use crate::domain::environment::TradeEnvironment;
use crate::domain::instrument::{InstrumentError, Market};
use crate::domain::order_execution::OrderStatus;
use crate::domain::shared::OrderId;
use crate::domain::trading_hours::MarketSession;

/// Stable error codes surfaced to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Gateway unreachable.
    ConnectionError,
    /// Session not connected.
    GatewayUnavailable,
    /// Transport failure or timeout.
    TransientGatewayError,
    /// Environment mismatch.
    EnvironmentMismatch,
    /// Price outside sanity band or no usable quote.
    PriceSanity,
    /// Market closed.
    MarketClosed,
    /// Operation not allowed in the current order state.
    InvalidState,
    /// Not enough buying power.
    InsufficientBuyingPower,
    /// Not enough sellable position.
    InsufficientPosition,
    /// Malformed intent.
    InvalidIntent,
    /// Unknown order.
    OrderNotFound,
    /// Gateway refused the request.
    GatewayRejected,
    /// Gateway reply malformed.
    GatewayProtocolError,
}

impl ErrorCode {
    /// Error reason string.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::ConnectionError => "CONNECTION_ERROR",
            Self::GatewayUnavailable => "GATEWAY_UNAVAILABLE",
            Self::TransientGatewayError => "TRANSIENT_GATEWAY_ERROR",
            Self::EnvironmentMismatch => "ENVIRONMENT_MISMATCH",
            Self::PriceSanity => "PRICE_SANITY",
            Self::MarketClosed => "MARKET_CLOSED",
            Self::InvalidState => "INVALID_STATE",
            Self::InsufficientBuyingPower => "INSUFFICIENT_BUYING_POWER",
            Self::InsufficientPosition => "INSUFFICIENT_POSITION",
            Self::InvalidIntent => "INVALID_INTENT",
            Self::OrderNotFound => "ORDER_NOT_FOUND",
            Self::GatewayRejected => "GATEWAY_REJECTED",
            Self::GatewayProtocolError => "GATEWAY_PROTOCOL_ERROR",
        }
    }

    /// Whether the failure is transient and may be retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionError | Self::GatewayUnavailable | Self::TransientGatewayError
        )
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// Errors returned by coordinator operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoordinatorError {
    /// Gateway unreachable within the bounded connect timeout.
    #[error("gateway connection failed: {0}")]
    Connection(String),

    /// Session is not connected; submissions are paused.
    #[error("gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// Transport failure or timeout; the caller may retry.
    #[error("transient gateway error: {0}")]
    TransientGateway(String),

    /// Intent declared a different environment than the process runs in.
    #[error("intent declares {declared} but the process runs in {current}")]
    EnvironmentMismatch {
        /// Environment declared by the intent.
        declared: TradeEnvironment,
        /// Process environment.
        current: TradeEnvironment,
    },

    /// Price failed the sanity check against the last quote.
    #[error("price sanity check failed for {code}: {message}")]
    PriceSanity {
        /// Instrument code.
        code: String,
        /// Detail.
        message: String,
    },

    /// Market not in a session that admits the order.
    #[error("{market} market is closed ({session} at {local_time} local)")]
    MarketClosed {
        /// Market.
        market: Market,
        /// Session at submit time.
        session: MarketSession,
        /// Exchange-local time.
        local_time: String,
    },

    /// Operation not allowed in the order's current state.
    #[error("cannot {operation} order {order_id} in state {status}")]
    InvalidState {
        /// Order id.
        order_id: OrderId,
        /// Current status.
        status: OrderStatus,
        /// Operation attempted.
        operation: &'static str,
    },

    /// Buy notional exceeds buying power.
    #[error("insufficient buying power: required {required}, available {available}")]
    InsufficientBuyingPower {
        /// Estimated notional.
        required: Decimal,
        /// Buying power.
        available: Decimal,
    },

    /// Sell quantity exceeds sellable position.
    #[error("insufficient position in {code}: requested {requested}, sellable {sellable}")]
    InsufficientPosition {
        /// Instrument code.
        code: String,
        /// Requested quantity.
        requested: Decimal,
        /// Sellable quantity.
        sellable: Decimal,
    },

    /// Malformed intent.
    #[error("invalid {field}: {message}")]
    InvalidIntent {
        /// Offending field.
        field: &'static str,
        /// Detail.
        message: String,
    },

    /// Unknown order id.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// Gateway refused the request.
    #[error("gateway rejected the request: {0}")]
    GatewayRejected(String),

    /// Gateway reply could not be understood.
    #[error("gateway protocol error: {0}")]
    GatewayProtocol(String),
}

impl CoordinatorError {
    /// The rule this error reports.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Connection(_) => ErrorCode::ConnectionError,
            Self::GatewayUnavailable(_) => ErrorCode::GatewayUnavailable,
            Self::TransientGateway(_) => ErrorCode::TransientGatewayError,
            Self::EnvironmentMismatch { .. } => ErrorCode::EnvironmentMismatch,
            Self::PriceSanity { .. } => ErrorCode::PriceSanity,
            Self::MarketClosed { .. } => ErrorCode::MarketClosed,
            Self::InvalidState { .. } => ErrorCode::InvalidState,
            Self::InsufficientBuyingPower { .. } => ErrorCode::InsufficientBuyingPower,
            Self::InsufficientPosition { .. } => ErrorCode::InsufficientPosition,
            Self::InvalidIntent { .. } => ErrorCode::InvalidIntent,
            Self::OrderNotFound(_) => ErrorCode::OrderNotFound,
            Self::GatewayRejected(_) => ErrorCode::GatewayRejected,
            Self::GatewayProtocol(_) => ErrorCode::GatewayProtocolError,
        }
    }

    /// Whether the caller may retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }
}

impl From<GatewayError> for CoordinatorError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Connection(msg) => Self::Connection(msg),
            GatewayError::Unavailable { state } => {
                Self::GatewayUnavailable(format!("session is {state}"))
            }
            GatewayError::Transient(msg) => Self::TransientGateway(msg),
            GatewayError::Timeout(after) => {
                Self::TransientGateway(format!("request timed out after {after:?}"))
            }
            GatewayError::Rejected(reason) => Self::GatewayRejected(reason),
            GatewayError::UnknownInstrument(code) => Self::InvalidIntent {
                field: "instrument",
                message: format!("gateway does not know {code}"),
            },
            GatewayError::Protocol(msg) => Self::GatewayProtocol(msg),
        }
    }
}

impl From<RetryFailure> for CoordinatorError {
    fn from(failure: RetryFailure) -> Self {
        failure.last_error.into()
    }
}

impl From<InstrumentError> for CoordinatorError {
    fn from(err: InstrumentError) -> Self {
        let field = match err {
            InstrumentError::InvalidQuantity { .. } => "quantity",
            InstrumentError::InvalidPrice { .. } => "price",
            _ => "instrument",
        };
        Self::InvalidIntent {
            field,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::SessionState;
    use std::time::Duration;

    #[test]
    fn connection_class_errors_are_retryable() {
        assert!(CoordinatorError::Connection("refused".into()).is_retryable());
        assert!(CoordinatorError::GatewayUnavailable("down".into()).is_retryable());
        assert!(CoordinatorError::TransientGateway("reset".into()).is_retryable());
    }

    #[test]
    fn business_rule_errors_are_not_retryable() {
        let mismatch = CoordinatorError::EnvironmentMismatch {
            declared: TradeEnvironment::Real,
            current: TradeEnvironment::Simulate,
        };
        assert!(!mismatch.is_retryable());
        assert_eq!(mismatch.code().reason(), "ENVIRONMENT_MISMATCH");
        assert!(mismatch.to_string().contains("REAL"));
    }

    #[test]
    fn gateway_errors_map_to_taxonomy() {
        let unavailable: CoordinatorError = GatewayError::Unavailable {
            state: SessionState::Degraded,
        }
        .into();
        assert_eq!(unavailable.code(), ErrorCode::GatewayUnavailable);

        let timeout: CoordinatorError = GatewayError::Timeout(Duration::from_secs(5)).into();
        assert_eq!(timeout.code(), ErrorCode::TransientGatewayError);

        let rejected: CoordinatorError = GatewayError::Rejected("no funds".into()).into();
        assert!(!rejected.is_retryable());
    }

    #[test]
    fn code_serializes_as_reason() {
        let json = serde_json::to_string(&ErrorCode::MarketClosed).unwrap();
        assert_eq!(json, format!("\"{}\"", ErrorCode::MarketClosed.reason()));
    }
}
