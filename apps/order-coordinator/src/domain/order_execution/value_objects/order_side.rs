//! Trade side.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade side. Agents may send either case; the gateway always gets upper case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    /// Spends buying power.
    #[serde(alias = "buy")]
    Buy,
    /// Consumes sellable position.
    #[serde(alias = "sell")]
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}
