//! Quote snapshot value object.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::instrument::InstrumentCode;

/// Top-of-book snapshot for one instrument.
///
/// Snapshots are never mutated; the cache replaces them wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    /// Instrument quoted.
    pub code: InstrumentCode,
    /// Best bid.
    pub bid: Decimal,
    /// Best ask.
    pub ask: Decimal,
    /// Last traded price.
    pub last: Decimal,
    /// Exchange timestamp of the quote.
    pub timestamp: DateTime<Utc>,
    /// Gateway sequence number.
    pub sequence: u64,
}

impl QuoteSnapshot {
    /// Price used for sanity checks: last trade, else the bid/ask midpoint.
    #[must_use]
    pub fn reference_price(&self) -> Option<Decimal> {
        if self.last > Decimal::ZERO {
            return Some(self.last);
        }
        if self.bid > Decimal::ZERO && self.ask > Decimal::ZERO {
            return self
                .bid
                .checked_add(self.ask)
                .and_then(|sum| sum.checked_div(Decimal::TWO));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn quote(bid: Decimal, ask: Decimal, last: Decimal) -> QuoteSnapshot {
        QuoteSnapshot {
            code: "US.AAPL".parse().unwrap(),
            bid,
            ask,
            last,
            timestamp: Utc.timestamp_opt(0, 0).unwrap(),
            sequence: 1,
        }
    }

    #[test]
    fn reference_prefers_last_trade() {
        assert_eq!(
            quote(dec!(99), dec!(101), dec!(100.5)).reference_price(),
            Some(dec!(100.5))
        );
    }

    #[test]
    fn reference_falls_back_to_mid() {
        assert_eq!(
            quote(dec!(99), dec!(101), dec!(0)).reference_price(),
            Some(dec!(100))
        );
        assert_eq!(quote(dec!(0), dec!(101), dec!(0)).reference_price(), None);
    }
}
