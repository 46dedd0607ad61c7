//! Account snapshot fetched from the gateway for pre-trade checks.
//!
//! Snapshots are read-only and are not cached: every order decision fetches
//! a fresh one.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::environment::TradeEnvironment;
use super::instrument::{InstrumentCode, Market};

/// Held position in one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Total quantity held.
    pub quantity: Decimal,
    /// Quantity not locked by open sell orders.
    pub sellable_quantity: Decimal,
    /// Average cost.
    pub cost_price: Decimal,
}

/// Cash, buying power and positions for one trading account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Environment the account belongs to.
    pub environment: TradeEnvironment,
    /// Market context the snapshot was fetched in.
    pub market: Market,
    /// Total assets.
    pub total_assets: Decimal,
    /// Cash balance.
    pub cash: Decimal,
    /// Market value of positions.
    pub market_value: Decimal,
    /// Cash frozen by open orders.
    pub frozen_cash: Decimal,
    /// Funds available for new buys.
    pub buying_power: Decimal,
    /// Open positions keyed by instrument.
    pub positions: HashMap<InstrumentCode, Position>,
    /// When the gateway produced the snapshot.
    pub fetched_at: DateTime<Utc>,
}

impl AccountSnapshot {
    /// Quantity available to sell, zero when no position is held.
    #[must_use]
    pub fn sellable(&self, code: &InstrumentCode) -> Decimal {
        self.positions
            .get(code)
            .map_or(Decimal::ZERO, |p| p.sellable_quantity)
    }

    /// Returns true if buying power covers `notional`.
    #[must_use]
    pub fn can_afford(&self, notional: Decimal) -> bool {
        notional <= self.buying_power
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot() -> AccountSnapshot {
        let mut positions = HashMap::new();
        positions.insert(
            "HK.00700".parse().unwrap(),
            Position {
                quantity: dec!(500),
                sellable_quantity: dec!(300),
                cost_price: dec!(350),
            },
        );
        AccountSnapshot {
            environment: TradeEnvironment::Simulate,
            market: Market::Hk,
            total_assets: dec!(1_000_000),
            cash: dec!(800_000),
            market_value: dec!(200_000),
            frozen_cash: dec!(0),
            buying_power: dec!(800_000),
            positions,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn sellable_uses_unlocked_quantity() {
        let snap = snapshot();
        assert_eq!(snap.sellable(&"HK.00700".parse().unwrap()), dec!(300));
        assert_eq!(snap.sellable(&"HK.09988".parse().unwrap()), dec!(0));
    }

    #[test]
    fn affordability_is_inclusive() {
        let snap = snapshot();
        assert!(snap.can_afford(dec!(800_000)));
        assert!(!snap.can_afford(dec!(800_000.01)));
    }
}
