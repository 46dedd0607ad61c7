//! Market DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::instrument::Market;
use crate::domain::trading_hours::{MarketSession, SessionStatus};

/// Trading state of one market at a given instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketStatusDto {
    /// Market.
    pub market: Market,
    /// Current session.
    pub session: MarketSession,
    /// Whether any session is running, extended hours included.
    pub is_trading: bool,
    /// Whether the exchange-local date is a Saturday or Sunday.
    pub is_weekend: bool,
    /// Exchange-local weekday, e.g. `Mon`.
    pub weekday: String,
    /// Exchange-local wall clock, `YYYY-MM-DD HH:MM:SS`.
    pub market_time: String,
    /// IANA timezone of the exchange.
    pub timezone: String,
    /// Instant evaluated.
    pub observed_at: DateTime<Utc>,
}

impl MarketStatusDto {
    /// Build from a computed session status.
    #[must_use]
    pub fn from_status(status: &SessionStatus, observed_at: DateTime<Utc>) -> Self {
        Self {
            market: status.market,
            session: status.session,
            is_trading: status.session.is_trading(),
            is_weekend: status.is_weekend(),
            weekday: status.weekday().to_string(),
            market_time: format!(
                "{} {}",
                status.local_date.format("%Y-%m-%d"),
                status.local_time.format("%H:%M:%S")
            ),
            timezone: status.market.timezone().name().to_string(),
            observed_at,
        }
    }
}
