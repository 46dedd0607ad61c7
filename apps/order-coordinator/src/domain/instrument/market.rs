//! Markets supported by the gateway.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::InstrumentError;

/// Exchange market an instrument trades on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Market {
    /// Hong Kong (HKEX).
    Hk,
    /// United States (NYSE/Nasdaq).
    Us,
}

impl Market {
    /// All supported markets.
    pub const ALL: [Self; 2] = [Self::Hk, Self::Us];

    /// Gateway code prefix.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hk => "HK",
            Self::Us => "US",
        }
    }

    /// Exchange-local timezone.
    #[must_use]
    pub const fn timezone(&self) -> Tz {
        match self {
            Self::Hk => chrono_tz::Asia::Hong_Kong,
            Self::Us => chrono_tz::America::New_York,
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Market {
    type Err = InstrumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "HK" => Ok(Self::Hk),
            "US" => Ok(Self::Us),
            other => Err(InstrumentError::UnknownMarket(other.to_string())),
        }
    }
}
