//! Order Aggregate Root
//!
//! Tracks one order from local creation to a terminal state. The local id is
//! assigned before the gateway sees the order; the gateway id is linked on
//! acknowledgement. The environment tag is fixed at creation.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::environment::TradeEnvironment;
use crate::domain::instrument::InstrumentCode;
use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::services::OrderStateMachine;
use crate::domain::order_execution::value_objects::{
    AnomalyKind, OrderAnomaly, OrderPricing, OrderSide, OrderStatus,
};
use crate::domain::shared::{GatewayOrderId, OrderId};

/// Command to create a new order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// Instrument.
    pub code: InstrumentCode,
    /// Side.
    pub side: OrderSide,
    /// Quantity.
    pub quantity: Decimal,
    /// Limit or market.
    pub pricing: OrderPricing,
    /// Environment captured at creation.
    pub environment: TradeEnvironment,
}

/// An order found at the gateway with no local record (restart recovery).
#[derive(Debug, Clone)]
pub struct RecoveredOrder {
    /// Gateway id.
    pub gateway_order_id: GatewayOrderId,
    /// Client id echoed by the gateway, if it carries one of ours.
    pub client_order_id: Option<OrderId>,
    /// Instrument.
    pub code: InstrumentCode,
    /// Side.
    pub side: OrderSide,
    /// Quantity.
    pub quantity: Decimal,
    /// Limit or market.
    pub pricing: OrderPricing,
    /// Environment the gateway reported the order in.
    pub environment: TradeEnvironment,
    /// Cumulative dealt quantity.
    pub filled_quantity: Decimal,
    /// When the gateway created the order.
    pub created_at: DateTime<Utc>,
}

/// Effect of applying a cumulative fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    /// Fill advanced by `delta`.
    Applied {
        /// Newly filled quantity.
        delta: Decimal,
    },
    /// Reported fill equals the recorded one.
    Unchanged,
}

/// Order aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    id: OrderId,
    gateway_order_id: Option<GatewayOrderId>,
    code: InstrumentCode,
    side: OrderSide,
    quantity: Decimal,
    pricing: OrderPricing,
    environment: TradeEnvironment,
    status: OrderStatus,
    filled_quantity: Decimal,
    average_fill_price: Option<Decimal>,
    reject_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    cancel_requested: bool,
    recovered: bool,
    missed_reports: u32,
    missing_since: Option<DateTime<Utc>>,
    anomalies: Vec<OrderAnomaly>,
    #[serde(skip)]
    seen_sequences: HashSet<u64>,
}

impl Order {
    /// Create a new order in `PENDING_SUBMIT`.
    pub fn new(cmd: NewOrder, now: DateTime<Utc>) -> Result<Self, OrderError> {
        if cmd.quantity <= Decimal::ZERO {
            return Err(OrderError::InvalidParameters {
                field: "quantity".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if let Some(price) = cmd.pricing.limit_price()
            && price <= Decimal::ZERO
        {
            return Err(OrderError::InvalidParameters {
                field: "price".to_string(),
                message: "must be positive".to_string(),
            });
        }

        Ok(Self {
            id: OrderId::generate(),
            gateway_order_id: None,
            code: cmd.code,
            side: cmd.side,
            quantity: cmd.quantity,
            pricing: cmd.pricing,
            environment: cmd.environment,
            status: OrderStatus::PendingSubmit,
            filled_quantity: Decimal::ZERO,
            average_fill_price: None,
            reject_reason: None,
            created_at: now,
            updated_at: now,
            cancel_requested: false,
            recovered: false,
            missed_reports: 0,
            missing_since: None,
            anomalies: Vec::new(),
            seen_sequences: HashSet::new(),
        })
    }

    /// Adopt an order the gateway knows about but this process does not.
    #[must_use]
    pub fn recovered(params: RecoveredOrder, now: DateTime<Utc>) -> Self {
        let filled = params.filled_quantity.max(Decimal::ZERO).min(params.quantity);
        let status = if filled.is_zero() {
            OrderStatus::Submitted
        } else {
            OrderStatus::PartiallyFilled
        };
        Self {
            id: params.client_order_id.unwrap_or_else(OrderId::generate),
            gateway_order_id: Some(params.gateway_order_id),
            code: params.code,
            side: params.side,
            quantity: params.quantity,
            pricing: params.pricing,
            environment: params.environment,
            status,
            filled_quantity: filled,
            average_fill_price: None,
            reject_reason: None,
            created_at: params.created_at,
            updated_at: now,
            cancel_requested: false,
            recovered: true,
            missed_reports: 0,
            missing_since: None,
            anomalies: Vec::new(),
            seen_sequences: HashSet::new(),
        }
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Local order id.
    #[must_use]
    pub const fn id(&self) -> &OrderId {
        &self.id
    }

    /// Gateway order id, once linked.
    #[must_use]
    pub const fn gateway_order_id(&self) -> Option<&GatewayOrderId> {
        self.gateway_order_id.as_ref()
    }

    /// Instrument.
    #[must_use]
    pub const fn code(&self) -> &InstrumentCode {
        &self.code
    }

    /// Side.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.side
    }

    /// Requested quantity.
    #[must_use]
    pub const fn quantity(&self) -> Decimal {
        self.quantity
    }

    /// Pricing.
    #[must_use]
    pub const fn pricing(&self) -> OrderPricing {
        self.pricing
    }

    /// Environment tag captured at creation.
    #[must_use]
    pub const fn environment(&self) -> TradeEnvironment {
        self.environment
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Cumulative filled quantity.
    #[must_use]
    pub const fn filled_quantity(&self) -> Decimal {
        self.filled_quantity
    }

    /// Quantity not yet filled.
    #[must_use]
    pub fn remaining_quantity(&self) -> Decimal {
        self.quantity - self.filled_quantity
    }

    /// Average fill price reported by the gateway.
    #[must_use]
    pub const fn average_fill_price(&self) -> Option<Decimal> {
        self.average_fill_price
    }

    /// Rejection reason, if rejected.
    #[must_use]
    pub fn reject_reason(&self) -> Option<&str> {
        self.reject_reason.as_deref()
    }

    /// Creation time.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last state change.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Whether a cancel was requested and not yet confirmed.
    #[must_use]
    pub const fn cancel_requested(&self) -> bool {
        self.cancel_requested
    }

    /// Whether the order was adopted from a gateway report.
    #[must_use]
    pub const fn is_recovered(&self) -> bool {
        self.recovered
    }

    /// Consecutive open-order reports the order was missing from.
    #[must_use]
    pub const fn missed_reports(&self) -> u32 {
        self.missed_reports
    }

    /// First report the order was missing from, while it stays missing.
    #[must_use]
    pub const fn missing_since(&self) -> Option<DateTime<Utc>> {
        self.missing_since
    }

    /// Raised anomalies.
    #[must_use]
    pub fn anomalies(&self) -> &[OrderAnomaly] {
        &self.anomalies
    }

    /// Returns true if an anomaly of `kind` is raised.
    #[must_use]
    pub fn has_anomaly(&self, kind: AnomalyKind) -> bool {
        self.anomalies.iter().any(|a| a.kind == kind)
    }

    // ========================================================================
    // State transitions
    // ========================================================================

    fn transition(&mut self, to: OrderStatus, now: DateTime<Utc>) -> Result<(), OrderError> {
        OrderStateMachine::validate_transition(self.status, to)?;
        self.status = to;
        self.updated_at = now;
        if to.is_terminal() {
            self.seen_sequences = HashSet::new();
        }
        Ok(())
    }

    /// Link the gateway id and move `PENDING_SUBMIT` to `SUBMITTED`.
    ///
    /// Idempotent for an already-linked, already-submitted order. Clears a
    /// `SubmitUnconfirmed` anomaly, since the gateway has now spoken.
    pub fn acknowledge(
        &mut self,
        gateway_order_id: GatewayOrderId,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if self.status == OrderStatus::PendingSubmit {
            self.transition(OrderStatus::Submitted, now)?;
        } else if self.status.is_terminal() {
            return Err(OrderError::InvalidStateTransition {
                from: self.status,
                to: OrderStatus::Submitted,
                reason: OrderStateMachine::transition_error_reason(
                    self.status,
                    OrderStatus::Submitted,
                ),
            });
        }
        self.gateway_order_id = Some(gateway_order_id);
        self.clear_anomaly(AnomalyKind::SubmitUnconfirmed);
        Ok(())
    }

    /// Apply a cumulative fill report.
    ///
    /// The recorded fill only moves forward and never exceeds the order
    /// quantity. A fill on a `PENDING_SUBMIT` order implies acceptance.
    pub fn apply_fill(
        &mut self,
        cumulative: Decimal,
        average_price: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<FillOutcome, OrderError> {
        if !self.status.can_fill() {
            let to = if cumulative >= self.quantity {
                OrderStatus::Filled
            } else {
                OrderStatus::PartiallyFilled
            };
            return Err(OrderError::InvalidStateTransition {
                from: self.status,
                to,
                reason: OrderStateMachine::transition_error_reason(self.status, to),
            });
        }
        if cumulative < self.filled_quantity {
            return Err(OrderError::FillRegression {
                reported: cumulative,
                recorded: self.filled_quantity,
            });
        }
        if cumulative > self.quantity {
            return Err(OrderError::Overfill {
                reported: cumulative,
                quantity: self.quantity,
            });
        }
        if cumulative == self.filled_quantity {
            if average_price.is_some() {
                self.average_fill_price = average_price;
            }
            return Ok(FillOutcome::Unchanged);
        }

        if self.status == OrderStatus::PendingSubmit {
            self.transition(OrderStatus::Submitted, now)?;
        }
        let to = if cumulative == self.quantity {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        self.transition(to, now)?;

        let delta = cumulative - self.filled_quantity;
        self.filled_quantity = cumulative;
        if average_price.is_some() {
            self.average_fill_price = average_price;
        }
        Ok(FillOutcome::Applied { delta })
    }

    /// Record the gateway's cancel confirmation. Filled quantity stands.
    pub fn confirm_cancelled(&mut self, now: DateTime<Utc>) -> Result<(), OrderError> {
        self.transition(OrderStatus::Cancelled, now)?;
        self.cancel_requested = false;
        Ok(())
    }

    /// Record a gateway rejection.
    ///
    /// A `SUBMITTED` order may only be rejected while nothing has filled.
    pub fn reject(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> Result<(), OrderError> {
        if !self.filled_quantity.is_zero() {
            return Err(OrderError::InvalidStateTransition {
                from: self.status,
                to: OrderStatus::Rejected,
                reason: "order has fills and cannot be rejected".to_string(),
            });
        }
        self.transition(OrderStatus::Rejected, now)?;
        self.reject_reason = Some(reason.into());
        self.clear_anomaly(AnomalyKind::SubmitUnconfirmed);
        Ok(())
    }

    /// Expire the order at market close.
    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<(), OrderError> {
        self.transition(OrderStatus::Expired, now)
    }

    /// Note that a cancel was requested from the gateway.
    pub const fn request_cancel(&mut self) {
        self.cancel_requested = true;
    }

    /// Forget a cancel request the gateway never received.
    pub const fn withdraw_cancel_request(&mut self) {
        self.cancel_requested = false;
    }

    /// Record the gateway id if none is linked yet. Returns true if linked now.
    pub fn link_gateway_id(&mut self, gateway_order_id: &GatewayOrderId) -> bool {
        if self.gateway_order_id.is_some() {
            return false;
        }
        self.gateway_order_id = Some(gateway_order_id.clone());
        true
    }

    /// Record a gateway sequence number. Returns false if already seen.
    ///
    /// Terminal orders no longer record sequences.
    pub fn observe_sequence(&mut self, sequence: u64) -> bool {
        if self.status.is_terminal() {
            return !self.seen_sequences.contains(&sequence);
        }
        self.seen_sequences.insert(sequence)
    }

    // ========================================================================
    // Reconciliation bookkeeping
    // ========================================================================

    /// Count one more open-order report the order was missing from.
    pub fn record_missed_report(&mut self, now: DateTime<Utc>) -> u32 {
        self.missed_reports = self.missed_reports.saturating_add(1);
        self.missing_since.get_or_insert(now);
        self.missed_reports
    }

    /// The order appeared in a report again.
    pub const fn reset_missed_reports(&mut self) {
        self.missed_reports = 0;
        self.missing_since = None;
    }

    /// Raise an anomaly. A kind already raised is not duplicated.
    ///
    /// Returns true if the anomaly was newly raised.
    pub fn raise_anomaly(
        &mut self,
        kind: AnomalyKind,
        detail: impl Into<String>,
        now: DateTime<Utc>,
    ) -> bool {
        if self.has_anomaly(kind) {
            return false;
        }
        self.anomalies.push(OrderAnomaly {
            kind,
            detail: detail.into(),
            raised_at: now,
        });
        true
    }

    /// Clear one kind of anomaly.
    pub fn clear_anomaly(&mut self, kind: AnomalyKind) -> bool {
        let before = self.anomalies.len();
        self.anomalies.retain(|a| a.kind != kind);
        self.anomalies.len() != before
    }

    /// Clear all anomalies (manual resolution). Returns the cleared kinds.
    pub fn clear_anomalies(&mut self) -> Vec<AnomalyKind> {
        self.reset_missed_reports();
        self.anomalies.drain(..).map(|a| a.kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn order(quantity: Decimal) -> Order {
        Order::new(
            NewOrder {
                code: "HK.00700".parse().unwrap(),
                side: OrderSide::Buy,
                quantity,
                pricing: OrderPricing::Limit { price: dec!(380) },
                environment: TradeEnvironment::Simulate,
            },
            t(0),
        )
        .unwrap()
    }

    fn submitted(quantity: Decimal) -> Order {
        let mut o = order(quantity);
        o.acknowledge(GatewayOrderId::new("g-1"), t(1)).unwrap();
        o
    }

    #[test]
    fn new_order_is_pending_submit() {
        let o = order(dec!(100));
        assert_eq!(o.status(), OrderStatus::PendingSubmit);
        assert!(o.gateway_order_id().is_none());
        assert_eq!(o.environment(), TradeEnvironment::Simulate);
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let result = Order::new(
            NewOrder {
                code: "US.AAPL".parse().unwrap(),
                side: OrderSide::Sell,
                quantity: dec!(0),
                pricing: OrderPricing::Market,
                environment: TradeEnvironment::Real,
            },
            t(0),
        );
        assert!(matches!(result, Err(OrderError::InvalidParameters { .. })));
    }

    #[test]
    fn acknowledge_links_gateway_id() {
        let o = submitted(dec!(100));
        assert_eq!(o.status(), OrderStatus::Submitted);
        assert_eq!(o.gateway_order_id().unwrap().as_str(), "g-1");
    }

    #[test]
    fn acknowledge_clears_unconfirmed_submit() {
        let mut o = order(dec!(100));
        assert!(o.raise_anomaly(AnomalyKind::SubmitUnconfirmed, "timeout", t(1)));
        o.acknowledge(GatewayOrderId::new("g-9"), t(2)).unwrap();
        assert!(!o.has_anomaly(AnomalyKind::SubmitUnconfirmed));
    }

    #[test]
    fn partial_then_full_fill() {
        let mut o = submitted(dec!(300));
        assert_eq!(
            o.apply_fill(dec!(100), Some(dec!(380)), t(2)).unwrap(),
            FillOutcome::Applied { delta: dec!(100) }
        );
        assert_eq!(o.status(), OrderStatus::PartiallyFilled);
        assert_eq!(o.remaining_quantity(), dec!(200));

        o.apply_fill(dec!(300), Some(dec!(380.2)), t(3)).unwrap();
        assert_eq!(o.status(), OrderStatus::Filled);
        assert_eq!(o.average_fill_price(), Some(dec!(380.2)));
    }

    #[test]
    fn fill_regression_is_rejected() {
        let mut o = submitted(dec!(300));
        o.apply_fill(dec!(200), None, t(2)).unwrap();
        let err = o.apply_fill(dec!(100), None, t(3)).unwrap_err();
        assert!(matches!(err, OrderError::FillRegression { .. }));
        assert_eq!(o.filled_quantity(), dec!(200));
    }

    #[test]
    fn overfill_is_rejected() {
        let mut o = submitted(dec!(100));
        assert!(matches!(
            o.apply_fill(dec!(101), None, t(2)),
            Err(OrderError::Overfill { .. })
        ));
        assert_eq!(o.status(), OrderStatus::Submitted);
    }

    #[test]
    fn fill_before_ack_implies_acceptance() {
        let mut o = order(dec!(100));
        o.apply_fill(dec!(100), None, t(2)).unwrap();
        assert_eq!(o.status(), OrderStatus::Filled);
    }

    #[test]
    fn cancel_after_partial_keeps_fill() {
        let mut o = submitted(dec!(300));
        o.apply_fill(dec!(100), None, t(2)).unwrap();
        o.request_cancel();
        o.confirm_cancelled(t(3)).unwrap();
        assert_eq!(o.status(), OrderStatus::Cancelled);
        assert_eq!(o.filled_quantity(), dec!(100));
        assert!(!o.cancel_requested());
    }

    #[test]
    fn terminal_order_is_immutable() {
        let mut o = submitted(dec!(100));
        o.apply_fill(dec!(100), None, t(2)).unwrap();
        assert!(o.confirm_cancelled(t(3)).is_err());
        assert!(o.expire(t(3)).is_err());
        assert!(o.reject("late", t(3)).is_err());
        assert!(o.apply_fill(dec!(100), None, t(3)).is_err());
        assert!(o.acknowledge(GatewayOrderId::new("g-2"), t(3)).is_err());
        assert_eq!(o.status(), OrderStatus::Filled);
        assert_eq!(o.gateway_order_id().unwrap().as_str(), "g-1");
    }

    #[test]
    fn reject_requires_no_fills() {
        let mut o = submitted(dec!(300));
        o.apply_fill(dec!(100), None, t(2)).unwrap();
        assert!(o.reject("exchange", t(3)).is_err());
    }

    #[test]
    fn sequences_are_deduplicated() {
        let mut o = order(dec!(100));
        assert!(o.observe_sequence(7));
        assert!(!o.observe_sequence(7));
        assert!(o.observe_sequence(8));
    }

    #[test]
    fn terminal_order_forgets_sequences() {
        let mut o = submitted(dec!(100));
        assert!(o.observe_sequence(1));
        assert!(o.observe_sequence(2));
        o.apply_fill(dec!(100), None, t(2)).unwrap();

        assert!(o.seen_sequences.is_empty());
        assert!(o.observe_sequence(3));
        assert!(o.seen_sequences.is_empty());
    }

    #[test]
    fn anomalies_are_not_duplicated_and_clear_manually() {
        let mut o = submitted(dec!(100));
        assert!(o.raise_anomaly(AnomalyKind::Unreconciled, "missing", t(5)));
        assert!(!o.raise_anomaly(AnomalyKind::Unreconciled, "still missing", t(6)));
        assert_eq!(o.anomalies().len(), 1);
        o.record_missed_report(t(5));
        o.record_missed_report(t(6));
        assert_eq!(o.missing_since(), Some(t(5)));
        assert_eq!(o.clear_anomalies(), vec![AnomalyKind::Unreconciled]);
        assert_eq!(o.missed_reports(), 0);
        assert_eq!(o.missing_since(), None);
    }

    #[test]
    fn recovered_order_clamps_fill() {
        let o = Order::recovered(
            RecoveredOrder {
                gateway_order_id: GatewayOrderId::new("g-77"),
                client_order_id: None,
                code: "US.AAPL".parse().unwrap(),
                side: OrderSide::Buy,
                quantity: dec!(10),
                pricing: OrderPricing::Market,
                environment: TradeEnvironment::Simulate,
                filled_quantity: dec!(4),
                created_at: t(0),
            },
            t(10),
        );
        assert!(o.is_recovered());
        assert_eq!(o.status(), OrderStatus::PartiallyFilled);
        assert_eq!(o.filled_quantity(), dec!(4));
    }

    proptest! {
        #[test]
        fn fill_is_monotonic_and_bounded(reports in proptest::collection::vec(0u32..=150, 1..40)) {
            let mut o = submitted(dec!(100));
            let mut previous = o.filled_quantity();
            for (i, r) in reports.into_iter().enumerate() {
                let _ = o.apply_fill(Decimal::from(r), None, t(i as i64 + 2));
                prop_assert!(o.filled_quantity() >= previous);
                prop_assert!(o.filled_quantity() <= o.quantity());
                previous = o.filled_quantity();
            }
        }
    }
}
