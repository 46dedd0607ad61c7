//! Order execution errors.

use rust_decimal::Decimal;
use thiserror::Error;

use super::value_objects::OrderStatus;

/// Errors raised by the order aggregate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderError {
    /// Transition not permitted by the lifecycle.
    #[error("invalid transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        /// Current status.
        from: OrderStatus,
        /// Attempted status.
        to: OrderStatus,
        /// Reason for failure.
        reason: String,
    },

    /// Cumulative fill would decrease.
    #[error("cumulative fill {reported} is below recorded fill {recorded}")]
    FillRegression {
        /// Reported cumulative quantity.
        reported: Decimal,
        /// Recorded cumulative quantity.
        recorded: Decimal,
    },

    /// Cumulative fill would exceed the order quantity.
    #[error("cumulative fill {reported} exceeds order quantity {quantity}")]
    Overfill {
        /// Reported cumulative quantity.
        reported: Decimal,
        /// Order quantity.
        quantity: Decimal,
    },

    /// Invalid order parameters.
    #[error("invalid {field}: {message}")]
    InvalidParameters {
        /// Field with invalid value.
        field: String,
        /// Error message.
        message: String,
    },
}
