//! Gateway event handling.
//!
//! Events may arrive duplicated or out of order. Duplicates are detected by
//! gateway sequence number; fills are cumulative and only ever move the
//! recorded quantity forward. Events for finished orders are logged as
//! anomalies and never applied.

use chrono::{DateTime, Utc};

use super::OrderCoordinator;
use crate::application::ports::GatewayPort;
use crate::domain::market_data::{QuoteSnapshot, UpdateOutcome};
use crate::domain::order_execution::{
    AnomalyKind, FillOutcome, GatewayOrderEvent, Order, OrderError, OrderEventKind, OrderStatus,
};
use crate::domain::shared::GatewayOrderId;
use crate::observability::{record_gateway_event, record_order_anomaly, record_quote_update};

/// How an order event was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// The order changed.
    Applied,
    /// The event carried nothing new.
    Unchanged,
    /// Sequence number already seen.
    Duplicate,
    /// No tracked order matches the event.
    UnknownOrder,
    /// The order is terminal; the event was logged and ignored.
    TerminalOrder,
    /// The event contradicts recorded state and was not applied.
    Refused,
}

impl EventOutcome {
    /// Metric label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Unchanged => "unchanged",
            Self::Duplicate => "duplicate",
            Self::UnknownOrder => "unknown_order",
            Self::TerminalOrder => "terminal_order",
            Self::Refused => "refused",
        }
    }
}

impl<G: GatewayPort + ?Sized> OrderCoordinator<G> {
    /// Apply a gateway order event.
    pub async fn on_gateway_event(&self, event: GatewayOrderEvent) -> EventOutcome {
        let outcome = self.apply_event(&event).await;
        record_gateway_event(outcome.as_str());
        outcome
    }

    async fn apply_event(&self, event: &GatewayOrderEvent) -> EventOutcome {
        let Some(handle) = self
            .orders
            .find(&event.gateway_order_id, event.client_order_id.as_ref())
        else {
            tracing::warn!(
                gateway_order_id = %event.gateway_order_id,
                sequence = event.sequence,
                event = event.kind.label(),
                "Event for unknown order, left for reconciliation"
            );
            return EventOutcome::UnknownOrder;
        };

        let mut order = handle.lock().await;
        if !order.observe_sequence(event.sequence) {
            tracing::debug!(
                order_id = %order.id(),
                sequence = event.sequence,
                "Dropped duplicate gateway event"
            );
            return EventOutcome::Duplicate;
        }
        if order.status().is_terminal() {
            record_order_anomaly("terminal_event");
            tracing::warn!(
                order_id = %order.id(),
                status = %order.status(),
                sequence = event.sequence,
                event = event.kind.label(),
                "Event for terminal order ignored"
            );
            return EventOutcome::TerminalOrder;
        }

        let now = event.timestamp;
        self.link_order(&mut order, &event.gateway_order_id, now);

        let result = match &event.kind {
            OrderEventKind::Accepted => Ok(EventOutcome::Applied),
            OrderEventKind::Fill {
                cumulative_quantity,
                average_price,
            } => order
                .apply_fill(*cumulative_quantity, *average_price, now)
                .map(|fill| match fill {
                    FillOutcome::Applied { .. } => EventOutcome::Applied,
                    FillOutcome::Unchanged => EventOutcome::Unchanged,
                }),
            OrderEventKind::Cancelled { cumulative_quantity } => {
                Self::apply_final_fill(&mut order, *cumulative_quantity, now)
                    .and_then(|()| order.confirm_cancelled(now))
                    .map(|()| EventOutcome::Applied)
            }
            OrderEventKind::Rejected { reason } => order
                .reject(reason.clone(), now)
                .map(|()| EventOutcome::Applied),
            OrderEventKind::Expired => order.expire(now).map(|()| EventOutcome::Applied),
        };

        match result {
            Ok(outcome) => {
                if outcome == EventOutcome::Applied {
                    tracing::info!(
                        order_id = %order.id(),
                        sequence = event.sequence,
                        event = event.kind.label(),
                        status = %order.status(),
                        filled = %order.filled_quantity(),
                        "Applied gateway event"
                    );
                }
                outcome
            }
            Err(err) => {
                Self::note_refused_event(&mut order, event, &err, now);
                EventOutcome::Refused
            }
        }
    }

    fn apply_final_fill(
        order: &mut Order,
        cumulative: Option<rust_decimal::Decimal>,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        match cumulative {
            Some(quantity) if quantity > order.filled_quantity() => {
                order.apply_fill(quantity, None, now).map(|_| ())
            }
            _ => Ok(()),
        }
    }

    fn note_refused_event(
        order: &mut Order,
        event: &GatewayOrderEvent,
        err: &OrderError,
        now: DateTime<Utc>,
    ) {
        if let OrderError::Overfill { .. } = err
            && order.raise_anomaly(AnomalyKind::Overfill, err.to_string(), now)
        {
            record_order_anomaly(AnomalyKind::Overfill.as_str());
        }
        tracing::warn!(
            order_id = %order.id(),
            sequence = event.sequence,
            event = event.kind.label(),
            status = %order.status(),
            error = %err,
            "Gateway event not applied"
        );
    }

    /// Link the gateway id and acknowledge a pending order.
    pub(super) fn link_order(
        &self,
        order: &mut Order,
        gateway_order_id: &GatewayOrderId,
        now: DateTime<Utc>,
    ) -> bool {
        let linked = order.link_gateway_id(gateway_order_id);
        if linked {
            self.orders.link(gateway_order_id, order.id());
        }
        if order.status() == OrderStatus::PendingSubmit
            && let Err(e) = order.acknowledge(gateway_order_id.clone(), now)
        {
            tracing::warn!(order_id = %order.id(), error = %e, "Acknowledgment not applied");
        }
        linked
    }

    /// Offer a quote to the cache.
    pub fn on_quote(&self, snapshot: QuoteSnapshot) -> UpdateOutcome {
        let outcome = self.market_data.update(snapshot);
        record_quote_update(match outcome {
            UpdateOutcome::Accepted => "accepted",
            UpdateOutcome::RejectedOutOfOrder { .. } => "out_of_order",
        });
        outcome
    }
}
