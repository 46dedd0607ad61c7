//! Day-order expiry at session close.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::application::coordinator::OrderCoordinator;
use crate::application::ports::GatewayPort;
use crate::domain::instrument::Market;

/// Expires live day orders once each enabled market's day has ended.
pub struct SessionCloseSweeper<G: GatewayPort + ?Sized + 'static> {
    coordinator: Arc<OrderCoordinator<G>>,
    markets: Vec<Market>,
    interval: Duration,
}

impl<G: GatewayPort + ?Sized + 'static> SessionCloseSweeper<G> {
    /// Create a sweeper checking `markets` every `interval`.
    #[must_use]
    pub const fn new(
        coordinator: Arc<OrderCoordinator<G>>,
        markets: Vec<Market>,
        interval: Duration,
    ) -> Self {
        Self {
            coordinator,
            markets,
            interval,
        }
    }

    /// Run until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let now = Utc::now();
                    for market in &self.markets {
                        let expired = self.coordinator.expire_day_orders(*market, now).await;
                        if !expired.is_empty() {
                            tracing::info!(market = %market, count = expired.len(), "Expired day orders");
                        }
                    }
                }
            }
        }
        tracing::debug!("Session-close sweeper stopped");
    }
}
