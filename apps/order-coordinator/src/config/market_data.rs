//! Market data configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::domain::instrument::InstrumentCode;

/// Market data configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketDataConfig {
    /// Maximum quote age for pre-trade validation, in milliseconds.
    #[serde(default = "default_staleness_threshold")]
    pub staleness_threshold_ms: u64,
    /// Allowed distance of a limit price from the last quote, in basis points.
    #[serde(default = "default_deviation_band")]
    pub deviation_band_bps: u32,
    /// Instruments allowed to trade pre/post market.
    #[serde(default)]
    pub extended_hours: Vec<InstrumentCode>,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            staleness_threshold_ms: default_staleness_threshold(),
            deviation_band_bps: default_deviation_band(),
            extended_hours: Vec::new(),
        }
    }
}

impl MarketDataConfig {
    /// Staleness threshold.
    #[must_use]
    pub const fn staleness_threshold(&self) -> Duration {
        Duration::from_millis(self.staleness_threshold_ms)
    }
}

const fn default_staleness_threshold() -> u64 {
    3000
}

const fn default_deviation_band() -> u32 {
    500
}
