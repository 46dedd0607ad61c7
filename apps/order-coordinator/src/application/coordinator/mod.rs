//! Order Lifecycle Coordinator
//!
//! Accepts order intents from the agent, validates them against the
//! environment guard, trading hours, the quote cache and a fresh account
//! snapshot, forwards them to the gateway, and keeps each order's state in
//! step with gateway events and periodic reconciliation.
//!
//! Every mutating path reads the trade environment through
//! [`EnvironmentGuard::current`] and nowhere else.

mod cancel;
mod events;
mod instruments;
mod lifecycle;
mod order_book;
mod reconcile;
mod submit;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::GatewayPort;
use crate::application::retry::RetryPolicy;
use crate::domain::environment::EnvironmentGuard;
use crate::domain::instrument::{InstrumentCode, Market};
use crate::domain::market_data::MarketDataCache;

pub use events::EventOutcome;
pub use instruments::InstrumentRegistry;
pub use lifecycle::{DEFAULT_BOOK_DEPTH, MAX_BOOK_DEPTH};
pub use order_book::{OrderBook, OrderHandle};

/// Coordinator settings resolved from configuration.
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    /// Market for bare symbols and the account context.
    pub default_market: Market,
    /// Markets the coordinator trades.
    pub enabled_markets: Vec<Market>,
    /// Maximum quote age for pre-trade validation.
    pub staleness_threshold: Duration,
    /// Allowed limit-price deviation from the reference price.
    pub deviation_band_bps: u32,
    /// Instruments admitted in pre/post-market sessions.
    pub extended_hours: HashSet<InstrumentCode>,
    /// How long an order must be missing before it is flagged.
    pub grace_period: Duration,
    /// Consecutive reports an order must be missing from before it is flagged.
    pub missed_report_threshold: u32,
    /// How long a finished order stays tracked after its last update.
    pub terminal_retention: Duration,
    /// Retry policy for gateway requests.
    pub retry: RetryPolicy,
}

/// The order lifecycle coordinator.
pub struct OrderCoordinator<G: GatewayPort + ?Sized> {
    gateway: Arc<G>,
    guard: EnvironmentGuard,
    market_data: Arc<MarketDataCache>,
    instruments: InstrumentRegistry,
    orders: OrderBook,
    settings: CoordinatorSettings,
}

impl<G: GatewayPort + ?Sized> OrderCoordinator<G> {
    /// Create a coordinator.
    #[must_use]
    pub fn new(
        gateway: Arc<G>,
        guard: EnvironmentGuard,
        market_data: Arc<MarketDataCache>,
        settings: CoordinatorSettings,
    ) -> Self {
        tracing::info!(
            environment = %guard.current(),
            default_market = %settings.default_market,
            grace_period_secs = settings.grace_period.as_secs(),
            missed_report_threshold = settings.missed_report_threshold,
            "Order coordinator created"
        );
        Self {
            gateway,
            guard,
            market_data,
            instruments: InstrumentRegistry::new(settings.extended_hours.clone()),
            orders: OrderBook::new(),
            settings,
        }
    }

    /// The environment guard.
    #[must_use]
    pub const fn guard(&self) -> &EnvironmentGuard {
        &self.guard
    }

    /// The quote cache.
    #[must_use]
    pub fn market_data(&self) -> &Arc<MarketDataCache> {
        &self.market_data
    }

    /// Settings.
    #[must_use]
    pub const fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    /// The gateway port.
    #[must_use]
    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }
}
