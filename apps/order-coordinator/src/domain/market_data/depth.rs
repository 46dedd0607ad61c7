//! Order book depth snapshot.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::instrument::InstrumentCode;

/// One aggregated price level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthLevel {
    /// Level price.
    pub price: Decimal,
    /// Shares resting at this price.
    pub volume: Decimal,
    /// Number of orders at this price.
    #[serde(default)]
    pub order_count: u32,
}

/// Bid and ask levels for one instrument, best price first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthSnapshot {
    /// Instrument.
    pub code: InstrumentCode,
    /// Bids, highest first.
    pub bids: Vec<DepthLevel>,
    /// Asks, lowest first.
    pub asks: Vec<DepthLevel>,
    /// Exchange timestamp.
    pub timestamp: DateTime<Utc>,
}

impl DepthSnapshot {
    /// Keep at most `depth` levels per side.
    #[must_use]
    pub fn truncated(mut self, depth: usize) -> Self {
        self.bids.truncate(depth);
        self.asks.truncate(depth);
        self
    }

    /// Whether bids descend and asks ascend strictly, and the book is not crossed.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        let bids_descend = self.bids.windows(2).all(|w| w[0].price > w[1].price);
        let asks_ascend = self.asks.windows(2).all(|w| w[0].price < w[1].price);
        let uncrossed = match (self.bids.first(), self.asks.first()) {
            (Some(bid), Some(ask)) => bid.price < ask.price,
            _ => true,
        };
        bids_descend && asks_ascend && uncrossed
    }

    /// Best bid price.
    #[must_use]
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|l| l.price)
    }

    /// Best ask price.
    #[must_use]
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|l| l.price)
    }
}
