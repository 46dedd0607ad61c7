//! Trading session calendar for HK and US equities.
//!
//! Pure logic: callers pass the instant to evaluate. Session windows are
//! start-inclusive, end-exclusive, in exchange-local time with daylight
//! saving handled by `chrono-tz`. Exchange holidays are not modelled.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::instrument::Market;

/// Session a market is in at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketSession {
    /// HK morning session.
    Morning,
    /// HK afternoon session.
    Afternoon,
    /// US regular session.
    Regular,
    /// US pre-market.
    PreMarket,
    /// US after-hours.
    AfterHours,
    /// Weekday outside every session.
    Closed,
    /// Saturday or Sunday.
    Weekend,
}

impl MarketSession {
    /// Wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "MORNING",
            Self::Afternoon => "AFTERNOON",
            Self::Regular => "REGULAR",
            Self::PreMarket => "PRE_MARKET",
            Self::AfterHours => "AFTER_HOURS",
            Self::Closed => "CLOSED",
            Self::Weekend => "WEEKEND",
        }
    }

    /// Whether an order may be submitted in this session.
    #[must_use]
    pub const fn admits(&self, extended_hours: bool) -> bool {
        match self {
            Self::Morning | Self::Afternoon | Self::Regular => true,
            Self::PreMarket | Self::AfterHours => extended_hours,
            Self::Closed | Self::Weekend => false,
        }
    }

    /// Whether the exchange is running any session, extended hours included.
    #[must_use]
    pub const fn is_trading(&self) -> bool {
        !matches!(self, Self::Closed | Self::Weekend)
    }
}

impl fmt::Display for MarketSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session plus the exchange-local wall clock it was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    /// Market evaluated.
    pub market: Market,
    /// Current session.
    pub session: MarketSession,
    /// Exchange-local date.
    pub local_date: NaiveDate,
    /// Exchange-local time of day.
    pub local_time: NaiveTime,
}

impl SessionStatus {
    /// Exchange-local weekday.
    #[must_use]
    pub fn weekday(&self) -> Weekday {
        self.local_date.weekday()
    }

    /// Whether the exchange-local date falls on a weekend.
    #[must_use]
    pub fn is_weekend(&self) -> bool {
        matches!(self.weekday(), Weekday::Sat | Weekday::Sun)
    }
}

struct Window {
    session: MarketSession,
    start: (u32, u32),
    end: (u32, u32),
}

const HK_WINDOWS: &[Window] = &[
    Window {
        session: MarketSession::Morning,
        start: (9, 30),
        end: (12, 0),
    },
    Window {
        session: MarketSession::Afternoon,
        start: (13, 0),
        end: (16, 0),
    },
];

const US_WINDOWS: &[Window] = &[
    Window {
        session: MarketSession::PreMarket,
        start: (4, 0),
        end: (9, 30),
    },
    Window {
        session: MarketSession::Regular,
        start: (9, 30),
        end: (16, 0),
    },
    Window {
        session: MarketSession::AfterHours,
        start: (16, 0),
        end: (20, 0),
    },
];

const fn windows(market: Market) -> &'static [Window] {
    match market {
        Market::Hk => HK_WINDOWS,
        Market::Us => US_WINDOWS,
    }
}

const fn minutes(hm: (u32, u32)) -> u32 {
    hm.0 * 60 + hm.1
}

/// Compute the session for `market` at `now`.
#[must_use]
pub fn session_at(market: Market, now: DateTime<Utc>) -> SessionStatus {
    let local = now.with_timezone(&market.timezone());
    let local_date = local.date_naive();
    let local_time = local.time();

    let session = if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        MarketSession::Weekend
    } else {
        let minute_of_day = local_time.hour() * 60 + local_time.minute();
        windows(market)
            .iter()
            .find(|w| minute_of_day >= minutes(w.start) && minute_of_day < minutes(w.end))
            .map_or(MarketSession::Closed, |w| w.session)
    };

    SessionStatus {
        market,
        session,
        local_date,
        local_time,
    }
}

/// Returns true when an order for `market` may be submitted at `now`.
#[must_use]
pub fn is_tradable(market: Market, extended_hours: bool, now: DateTime<Utc>) -> bool {
    session_at(market, now).session.admits(extended_hours)
}

/// Returns true when the trading day for `market` has ended at `now`.
///
/// Used to expire day orders: the day ends with the last window of the
/// weekday (HK afternoon close, US after-hours close).
#[must_use]
pub fn is_after_day_end(market: Market, now: DateTime<Utc>) -> bool {
    let status = session_at(market, now);
    if status.session == MarketSession::Weekend {
        return false;
    }
    let day_end = windows(market).last().map_or(0, |w| minutes(w.end));
    status.local_time.hour() * 60 + status.local_time.minute() >= day_end
}
