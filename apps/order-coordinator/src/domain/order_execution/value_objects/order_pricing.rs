//! Limit or market pricing for an order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How an order is priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderPricing {
    /// Execute at the best available price.
    Market,
    /// Execute at `price` or better.
    Limit {
        /// Limit price.
        price: Decimal,
    },
}

impl OrderPricing {
    /// Build from an optional limit price (`None` means market).
    #[must_use]
    pub const fn from_limit(price: Option<Decimal>) -> Self {
        match price {
            Some(price) => Self::Limit { price },
            None => Self::Market,
        }
    }

    /// The limit price, if any.
    #[must_use]
    pub const fn limit_price(&self) -> Option<Decimal> {
        match self {
            Self::Market => None,
            Self::Limit { price } => Some(*price),
        }
    }

    /// Returns true for market orders.
    #[must_use]
    pub const fn is_market(&self) -> bool {
        matches!(self, Self::Market)
    }
}
