//! Trade environment and the guard every mutating path consults.
//!
//! The guard is built once at startup from explicit configuration and is
//! immutable afterwards. There is no `Default` for either type: a missing or
//! unrecognized environment is a startup error, never a silent SIMULATE.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Trading environment an order is executed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeEnvironment {
    /// Paper trading against the gateway's simulated account.
    Simulate,
    /// Real money.
    Real,
}

impl TradeEnvironment {
    /// Wire name used by the gateway and configuration.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Simulate => "SIMULATE",
            Self::Real => "REAL",
        }
    }

    /// Returns true for real-money execution.
    #[must_use]
    pub const fn is_real(&self) -> bool {
        matches!(self, Self::Real)
    }
}

impl fmt::Display for TradeEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a trade environment.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid trade environment '{0}': expected SIMULATE or REAL")]
pub struct ParseEnvironmentError(pub String);

impl FromStr for TradeEnvironment {
    type Err = ParseEnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SIMULATE" => Ok(Self::Simulate),
            "REAL" => Ok(Self::Real),
            _ => Err(ParseEnvironmentError(s.to_string())),
        }
    }
}

/// Process-wide environment value, injected into the coordinator.
///
/// `current()` is the only way order logic learns which environment it runs
/// in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentGuard {
    environment: TradeEnvironment,
}

impl EnvironmentGuard {
    /// Create a guard for an explicitly chosen environment.
    #[must_use]
    pub const fn new(environment: TradeEnvironment) -> Self {
        Self { environment }
    }

    /// Build a guard from a configured value. Absent or unknown values fail.
    pub fn from_config(value: Option<&str>) -> Result<Self, ParseEnvironmentError> {
        let raw = value.unwrap_or_default();
        raw.parse().map(Self::new)
    }

    /// The environment this process executes in.
    #[must_use]
    pub const fn current(&self) -> TradeEnvironment {
        self.environment
    }

    /// Returns true when `declared` matches the process environment.
    #[must_use]
    pub fn admits(&self, declared: TradeEnvironment) -> bool {
        self.environment == declared
    }
}
