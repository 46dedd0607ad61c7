//! Order events pushed by the gateway.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{GatewayOrderId, OrderId};

/// What happened to the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEventKind {
    /// Gateway accepted the order.
    Accepted,
    /// Cumulative fill update.
    Fill {
        /// Total quantity dealt so far.
        cumulative_quantity: Decimal,
        /// Average dealt price.
        average_price: Option<Decimal>,
    },
    /// Remaining quantity cancelled.
    Cancelled {
        /// Final dealt quantity, when the gateway reports it.
        #[serde(default)]
        cumulative_quantity: Option<Decimal>,
    },
    /// Gateway or exchange rejected the order.
    Rejected {
        /// Reason text.
        reason: String,
    },
    /// Order expired.
    Expired,
}

impl OrderEventKind {
    /// Short label for logs and metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Fill { .. } => "fill",
            Self::Cancelled { .. } => "cancelled",
            Self::Rejected { .. } => "rejected",
            Self::Expired => "expired",
        }
    }
}

/// An order event with its gateway sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrderEvent {
    /// Gateway sequence number, unique per event.
    pub sequence: u64,
    /// Gateway order id.
    pub gateway_order_id: GatewayOrderId,
    /// Client order id echoed back by the gateway, if any.
    #[serde(default)]
    pub client_order_id: Option<OrderId>,
    /// Event payload.
    pub kind: OrderEventKind,
    /// Gateway timestamp.
    pub timestamp: DateTime<Utc>,
}
