//! Order status in the lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of an order tracked by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Created locally, not yet acknowledged by the gateway.
    PendingSubmit,
    /// Acknowledged by the gateway and working.
    Submitted,
    /// Some quantity filled, remainder working.
    PartiallyFilled,
    /// Fully filled.
    Filled,
    /// Cancelled; any filled quantity stands.
    Cancelled,
    /// Rejected by the gateway.
    Rejected,
    /// Expired at market close.
    Expired,
}

impl OrderStatus {
    /// Returns true if the order is in a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Cancelled | Self::Rejected | Self::Expired
        )
    }

    /// Returns true if a cancel request may be issued.
    #[must_use]
    pub const fn is_cancelable(&self) -> bool {
        matches!(
            self,
            Self::PendingSubmit | Self::Submitted | Self::PartiallyFilled
        )
    }

    /// Returns true if fills may still be applied.
    #[must_use]
    pub const fn can_fill(&self) -> bool {
        matches!(
            self,
            Self::PendingSubmit | Self::Submitted | Self::PartiallyFilled
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PendingSubmit => "PENDING_SUBMIT",
            Self::Submitted => "SUBMITTED",
            Self::PartiallyFilled => "PARTIALLY_FILLED",
            Self::Filled => "FILLED",
            Self::Cancelled => "CANCELLED",
            Self::Rejected => "REJECTED",
            Self::Expired => "EXPIRED",
        };
        write!(f, "{s}")
    }
}
