//! Periodic reconciliation.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::application::coordinator::OrderCoordinator;
use crate::application::ports::GatewayPort;
use crate::domain::session::{SessionSnapshot, SessionState};

/// Runs [`OrderCoordinator::reconcile`] on an interval and right after every
/// reconnect.
pub struct ReconciliationLoop<G: GatewayPort + ?Sized + 'static> {
    coordinator: Arc<OrderCoordinator<G>>,
    interval: Duration,
    session: watch::Receiver<SessionSnapshot>,
}

impl<G: GatewayPort + ?Sized + 'static> ReconciliationLoop<G> {
    /// Create the loop.
    #[must_use]
    pub const fn new(
        coordinator: Arc<OrderCoordinator<G>>,
        interval: Duration,
        session: watch::Receiver<SessionSnapshot>,
    ) -> Self {
        Self {
            coordinator,
            interval,
            session,
        }
    }

    /// Run until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut last_state = self.session.borrow().state;
        tracing::info!(interval_secs = self.interval.as_secs(), "Reconciliation loop started");

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => self.run_once().await,
                changed = self.session.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = self.session.borrow_and_update().state;
                    let reconnected = state == SessionState::Connected && last_state != SessionState::Connected;
                    last_state = state;
                    if reconnected {
                        tracing::info!("Session re-established, reconciling");
                        self.run_once().await;
                    }
                }
            }
        }
        tracing::info!("Reconciliation loop stopped");
    }

    async fn run_once(&self) {
        if self.session.borrow().state != SessionState::Connected {
            tracing::debug!("Skipping reconciliation while the gateway is not connected");
            return;
        }
        match self.coordinator.reconcile().await {
            Ok(summary) => {
                if !summary.flagged_unreconciled.is_empty() || !summary.adopted.is_empty() {
                    tracing::info!(
                        flagged = summary.flagged_unreconciled.len(),
                        adopted = summary.adopted.len(),
                        finalized = summary.finalized,
                        "Reconciliation found changes"
                    );
                }
            }
            Err(e) => tracing::warn!(error = %e, code = %e.code(), "Reconciliation failed"),
        }
    }
}
