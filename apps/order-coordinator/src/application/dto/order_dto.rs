//! Order DTOs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::environment::TradeEnvironment;
use crate::domain::order_execution::{AnomalyKind, Order, OrderAnomaly, OrderSide, OrderStatus};
use crate::domain::shared::OrderId;

/// Order intent produced by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntentDto {
    /// Instrument, `MARKET.SYMBOL` or a bare symbol in the default market.
    pub instrument: String,
    /// Side.
    pub side: OrderSide,
    /// Quantity in shares.
    pub quantity: Decimal,
    /// Limit price; `None` for a market order.
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Environment the agent believes it is trading in.
    pub environment: TradeEnvironment,
}

/// Result of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    /// Local order id.
    pub order_id: OrderId,
    /// Status after the gateway round-trip.
    pub status: OrderStatus,
    /// Gateway rejection reason, if rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
    /// Anomalies raised during submission.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anomalies: Vec<AnomalyKind>,
}

impl SubmitReceipt {
    /// Build from the order after submission.
    #[must_use]
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id().clone(),
            status: order.status(),
            reject_reason: order.reject_reason().map(str::to_string),
            anomalies: order.anomalies().iter().map(|a| a.kind).collect(),
        }
    }
}

/// DTO representing an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDto {
    /// Order ID.
    pub order_id: String,
    /// Gateway order ID.
    pub gateway_order_id: Option<String>,
    /// Instrument code.
    pub instrument: String,
    /// Side.
    pub side: OrderSide,
    /// Quantity.
    pub quantity: Decimal,
    /// Limit price.
    pub limit_price: Option<Decimal>,
    /// Filled quantity.
    pub filled_quantity: Decimal,
    /// Remaining quantity.
    pub remaining_quantity: Decimal,
    /// Average fill price.
    pub average_fill_price: Option<Decimal>,
    /// Status.
    pub status: OrderStatus,
    /// Environment.
    pub environment: TradeEnvironment,
    /// Rejection reason.
    pub reject_reason: Option<String>,
    /// Cancel requested and awaiting gateway confirmation.
    pub cancel_requested: bool,
    /// Adopted from the gateway on recovery.
    pub recovered: bool,
    /// Open anomalies.
    pub anomalies: Vec<OrderAnomaly>,
    /// Created at.
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Updated at.
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl OrderDto {
    /// Create from domain Order.
    #[must_use]
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id().to_string(),
            gateway_order_id: order.gateway_order_id().map(ToString::to_string),
            instrument: order.code().to_string(),
            side: order.side(),
            quantity: order.quantity(),
            limit_price: order.pricing().limit_price(),
            filled_quantity: order.filled_quantity(),
            remaining_quantity: order.remaining_quantity(),
            average_fill_price: order.average_fill_price(),
            status: order.status(),
            environment: order.environment(),
            reject_reason: order.reject_reason().map(str::to_string),
            cancel_requested: order.cancel_requested(),
            recovered: order.is_recovered(),
            anomalies: order.anomalies().to_vec(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
        }
    }

    /// Returns true if an anomaly of `kind` is open.
    #[must_use]
    pub fn has_anomaly(&self, kind: AnomalyKind) -> bool {
        self.anomalies.iter().any(|a| a.kind == kind)
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    /// Local orders found in the report.
    pub matched: usize,
    /// Local orders linked to their gateway id by client reference.
    pub linked: usize,
    /// Local orders whose fill advanced from the report.
    pub fills_applied: usize,
    /// Local orders moved to a terminal status from the report.
    pub finalized: usize,
    /// Local orders missing from the report.
    pub missing: usize,
    /// Orders newly flagged `UNRECONCILED`.
    pub flagged_unreconciled: Vec<OrderId>,
    /// Unknown gateway orders adopted.
    pub adopted: Vec<OrderId>,
    /// Deferred cancels forwarded.
    pub cancels_forwarded: usize,
    /// Finished orders no longer tracked.
    #[serde(default)]
    pub pruned: Vec<OrderId>,
}
