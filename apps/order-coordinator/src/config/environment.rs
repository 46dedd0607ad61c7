//! Trade environment and market configuration.

use serde::Deserialize;

use crate::domain::instrument::Market;

/// Environment configuration.
///
/// `mode` has no default: a process that does not say SIMULATE or REAL does
/// not start.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentConfig {
    /// SIMULATE or REAL.
    #[serde(default)]
    pub mode: Option<String>,
    /// Default market for bare symbols and the account context.
    #[serde(default = "default_market")]
    pub market: Market,
    /// Markets orders may be placed in.
    #[serde(default = "default_markets")]
    pub markets: Vec<Market>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            mode: None,
            market: default_market(),
            markets: default_markets(),
        }
    }
}

const fn default_market() -> Market {
    Market::Hk
}

fn default_markets() -> Vec<Market> {
    Market::ALL.to_vec()
}
