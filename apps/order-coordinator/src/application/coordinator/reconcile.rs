//! Reconciliation against the gateway's order list.
//!
//! The gateway owns order truth. A local order that keeps missing from the
//! gateway's list is flagged `UNRECONCILED` rather than resolved by
//! guessing; the flag stays until an operator resolves it. Gateway orders
//! this process does not know, such as orders placed before a restart, are
//! adopted. Finished orders without anomalies are dropped once they have
//! been quiet for the retention period.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::OrderCoordinator;
use crate::application::dto::ReconcileSummary;
use crate::application::ports::{GatewayOrderReport, GatewayPort};
use crate::application::retry::with_retry;
use crate::domain::instrument::InstrumentCode;
use crate::domain::order_execution::{
    AnomalyKind, FillOutcome, Order, OrderStatus, RecoveredOrder,
};
use crate::domain::shared::{GatewayOrderId, OrderId};
use crate::error::CoordinatorError;
use crate::observability::record_order_anomaly;

impl<G: GatewayPort + ?Sized> OrderCoordinator<G> {
    /// Fetch the gateway's order list and reconcile against it.
    pub async fn reconcile(&self) -> Result<ReconcileSummary, CoordinatorError> {
        let environment = self.guard.current();
        let gateway = self.gateway.as_ref();
        let reports = with_retry(&self.settings.retry, "open_orders", move || {
            gateway.open_orders(environment)
        })
        .await?;
        Ok(self.reconcile_report(&reports, Utc::now()).await)
    }

    /// Reconcile tracked orders against `reports` as of `now`.
    pub async fn reconcile_report(
        &self,
        reports: &[GatewayOrderReport],
        now: DateTime<Utc>,
    ) -> ReconcileSummary {
        let environment = self.guard.current();
        let mut summary = ReconcileSummary::default();
        let mut claimed: HashSet<&GatewayOrderId> = HashSet::new();
        let mut cancels: Vec<(OrderId, GatewayOrderId, InstrumentCode)> = Vec::new();

        for handle in self.orders.handles() {
            let mut order = handle.lock().await;
            if order.status().is_terminal() || order.environment() != environment {
                continue;
            }
            let report = reports.iter().find(|r| {
                order.gateway_order_id() == Some(&r.gateway_order_id)
                    || r.client_order_id.as_ref() == Some(order.id())
            });

            match report {
                Some(report) => {
                    claimed.insert(&report.gateway_order_id);
                    summary.matched += 1;
                    self.apply_report(&mut order, report, now, &mut summary);
                    if order.cancel_requested()
                        && !order.status().is_terminal()
                        && let Some(gateway_order_id) = order.gateway_order_id()
                    {
                        cancels.push((
                            order.id().clone(),
                            gateway_order_id.clone(),
                            order.code().clone(),
                        ));
                    }
                }
                None => {
                    if order.status() == OrderStatus::PendingSubmit
                        && !order.has_anomaly(AnomalyKind::SubmitUnconfirmed)
                    {
                        // still in flight
                        continue;
                    }
                    summary.missing += 1;
                    if self.note_missing(&mut order, now) {
                        summary.flagged_unreconciled.push(order.id().clone());
                    }
                }
            }
        }

        for report in reports {
            if claimed.contains(&report.gateway_order_id)
                || !report.is_open()
                || report.environment != environment
                || self.orders.knows_gateway_id(&report.gateway_order_id)
                || report
                    .client_order_id
                    .as_ref()
                    .is_some_and(|id| self.orders.get(id).is_some())
            {
                continue;
            }
            let order = Order::recovered(
                RecoveredOrder {
                    gateway_order_id: report.gateway_order_id.clone(),
                    client_order_id: report.client_order_id.clone(),
                    code: report.code.clone(),
                    side: report.side,
                    quantity: report.quantity,
                    pricing: report.pricing,
                    environment: report.environment,
                    filled_quantity: report.dealt_quantity,
                    created_at: report.created_at,
                },
                now,
            );
            tracing::info!(
                order_id = %order.id(),
                gateway_order_id = %report.gateway_order_id,
                code = %report.code,
                status = %order.status(),
                "Adopted gateway order"
            );
            summary.adopted.push(order.id().clone());
            self.orders.insert(order);
        }

        for (order_id, gateway_order_id, code) in cancels {
            match self.forward_cancel(&order_id, gateway_order_id, code).await {
                Ok(()) => summary.cancels_forwarded += 1,
                Err(e) => {
                    tracing::warn!(order_id = %order_id, error = %e, "Deferred cancel failed");
                }
            }
        }

        summary.pruned = self.prune_finished(now).await;

        tracing::debug!(
            matched = summary.matched,
            missing = summary.missing,
            flagged = summary.flagged_unreconciled.len(),
            adopted = summary.adopted.len(),
            pruned = summary.pruned.len(),
            "Reconciliation pass complete"
        );
        summary
    }

    /// Stop tracking terminal orders that carry no anomaly and have not
    /// changed for the retention period.
    async fn prune_finished(&self, now: DateTime<Utc>) -> Vec<OrderId> {
        let retention = chrono::Duration::from_std(self.settings.terminal_retention)
            .unwrap_or(chrono::Duration::MAX);
        let mut finished = Vec::new();
        for handle in self.orders.handles() {
            let order = handle.lock().await;
            if order.status().is_terminal()
                && order.anomalies().is_empty()
                && now.signed_duration_since(order.updated_at()) >= retention
            {
                finished.push(order.id().clone());
            }
        }
        for order_id in &finished {
            self.orders.remove(order_id);
            tracing::debug!(order_id = %order_id, "Finished order pruned");
        }
        finished
    }

    fn apply_report(
        &self,
        order: &mut Order,
        report: &GatewayOrderReport,
        now: DateTime<Utc>,
        summary: &mut ReconcileSummary,
    ) {
        order.reset_missed_reports();
        if self.link_order(order, &report.gateway_order_id, now) {
            summary.linked += 1;
        }

        if report.dealt_quantity > order.filled_quantity() {
            match order.apply_fill(report.dealt_quantity, report.dealt_average_price, now) {
                Ok(FillOutcome::Applied { .. }) => summary.fills_applied += 1,
                Ok(FillOutcome::Unchanged) => {}
                Err(e) => {
                    if order.raise_anomaly(AnomalyKind::Overfill, e.to_string(), now) {
                        record_order_anomaly(AnomalyKind::Overfill.as_str());
                    }
                    tracing::warn!(order_id = %order.id(), error = %e, "Reported fill not applied");
                }
            }
        } else if report.dealt_quantity < order.filled_quantity() {
            let detail = format!(
                "gateway reports {} dealt, {} recorded",
                report.dealt_quantity,
                order.filled_quantity()
            );
            if order.raise_anomaly(AnomalyKind::FillRegression, detail, now) {
                record_order_anomaly(AnomalyKind::FillRegression.as_str());
                tracing::warn!(
                    order_id = %order.id(),
                    reported = %report.dealt_quantity,
                    recorded = %order.filled_quantity(),
                    "Gateway reports less fill than recorded"
                );
            }
        }

        if report.status.is_terminal() && !order.status().is_terminal() {
            let result = match report.status {
                OrderStatus::Cancelled => order.confirm_cancelled(now),
                OrderStatus::Rejected => order.reject("rejected by gateway", now),
                OrderStatus::Expired => order.expire(now),
                _ => Ok(()),
            };
            match result {
                Ok(()) if order.status().is_terminal() => {
                    summary.finalized += 1;
                    tracing::info!(
                        order_id = %order.id(),
                        status = %order.status(),
                        "Order finalized from gateway report"
                    );
                }
                Ok(()) => {}
                Err(e) => {
                    tracing::warn!(order_id = %order.id(), error = %e, "Reported status not applied");
                }
            }
        }
    }

    /// Count a missed report. Returns true if the order was newly flagged.
    fn note_missing(&self, order: &mut Order, now: DateTime<Utc>) -> bool {
        let missed = order.record_missed_report(now);
        let missing_for = order
            .missing_since()
            .and_then(|since| (now - since).to_std().ok())
            .unwrap_or_default();
        if missed < self.settings.missed_report_threshold
            || missing_for < self.settings.grace_period
        {
            return false;
        }
        let detail = format!(
            "missing from {missed} consecutive gateway reports for {}s",
            missing_for.as_secs()
        );
        if !order.raise_anomaly(AnomalyKind::Unreconciled, detail, now) {
            return false;
        }
        record_order_anomaly(AnomalyKind::Unreconciled.as_str());
        tracing::warn!(
            order_id = %order.id(),
            status = %order.status(),
            missed_reports = missed,
            missing_secs = missing_for.as_secs(),
            "Order flagged UNRECONCILED"
        );
        true
    }
}
