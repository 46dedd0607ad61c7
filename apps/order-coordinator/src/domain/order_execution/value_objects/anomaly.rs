//! Anomaly flags attached to orders for operator or agent attention.
//!
//! Anomalies are never resolved automatically except where the gateway later
//! supplies the missing truth (an unconfirmed submit that gets acknowledged).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    /// Open locally but missing from repeated gateway open-order reports.
    Unreconciled,
    /// Submit outcome unknown: the request may or may not have reached the gateway.
    SubmitUnconfirmed,
    /// Gateway reported a cumulative fill below the recorded one.
    FillRegression,
    /// Gateway reported a cumulative fill above the order quantity.
    Overfill,
}

impl AnomalyKind {
    /// Wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unreconciled => "UNRECONCILED",
            Self::SubmitUnconfirmed => "SUBMIT_UNCONFIRMED",
            Self::FillRegression => "FILL_REGRESSION",
            Self::Overfill => "OVERFILL",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raised anomaly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAnomaly {
    /// Kind.
    pub kind: AnomalyKind,
    /// Human-readable detail.
    pub detail: String,
    /// When it was raised.
    pub raised_at: DateTime<Utc>,
}
