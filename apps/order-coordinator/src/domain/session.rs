//! Gateway session state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection state of the single gateway session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// No connection.
    Disconnected,
    /// Connected and heartbeating.
    Connected,
    /// Transport failed or heartbeat missed; reconnecting.
    Degraded,
}

impl SessionState {
    /// Returns true if new submissions may proceed.
    #[must_use]
    pub const fn accepts_submissions(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "DISCONNECTED"),
            Self::Connected => write!(f, "CONNECTED"),
            Self::Degraded => write!(f, "DEGRADED"),
        }
    }
}

/// Observable snapshot of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Current state.
    pub state: SessionState,
    /// Last heartbeat acknowledged by the gateway.
    pub last_heartbeat: Option<DateTime<Utc>>,
    /// Reconnect attempts since the last successful connect.
    pub reconnect_attempts: u32,
}

impl SessionSnapshot {
    /// Initial, disconnected snapshot.
    #[must_use]
    pub const fn disconnected() -> Self {
        Self {
            state: SessionState::Disconnected,
            last_heartbeat: None,
            reconnect_attempts: 0,
        }
    }
}
