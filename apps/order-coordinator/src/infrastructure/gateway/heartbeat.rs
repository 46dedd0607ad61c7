//! Gateway heartbeat tracking.
//!
//! The supervisor pings on an interval; the reader records pongs. A session
//! whose last pong is older than the timeout while a ping is outstanding is
//! considered dead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::config::GatewayConfig;

/// Ping cadence and tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Interval between pings.
    pub interval: Duration,
    /// Silence tolerated before the session degrades.
    pub timeout: Duration,
}

impl HeartbeatConfig {
    /// Settings from the gateway section of the configuration.
    #[must_use]
    pub const fn from_gateway_config(config: &GatewayConfig) -> Self {
        Self {
            interval: config.heartbeat_interval(),
            timeout: config.heartbeat_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LastPong {
    at: Instant,
    wall: Option<DateTime<Utc>>,
}

/// Heartbeat state shared between the supervisor and the frame reader.
#[derive(Debug)]
pub struct HeartbeatState {
    last_pong: RwLock<LastPong>,
    awaiting_pong: AtomicBool,
}

impl Default for HeartbeatState {
    fn default() -> Self {
        Self::new()
    }
}

impl HeartbeatState {
    /// Fresh state; the connection counts as alive from now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_pong: RwLock::new(LastPong {
                at: Instant::now(),
                wall: None,
            }),
            awaiting_pong: AtomicBool::new(false),
        }
    }

    /// A pong arrived.
    pub fn record_pong(&self) -> DateTime<Utc> {
        let wall = Utc::now();
        *self.last_pong.write() = LastPong {
            at: Instant::now(),
            wall: Some(wall),
        };
        self.awaiting_pong.store(false, Ordering::SeqCst);
        wall
    }

    /// A ping went out.
    pub fn mark_ping_sent(&self) {
        self.awaiting_pong.store(true, Ordering::SeqCst);
    }

    /// Wall-clock time of the last pong, if any.
    #[must_use]
    pub fn last_pong_at(&self) -> Option<DateTime<Utc>> {
        self.last_pong.read().wall
    }

    /// Time since the last pong (or since reset).
    #[must_use]
    pub fn silence(&self) -> Duration {
        self.last_pong.read().at.elapsed()
    }

    /// Returns true when a ping is outstanding and the silence exceeds `timeout`.
    #[must_use]
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.awaiting_pong.load(Ordering::SeqCst) && self.silence() > timeout
    }

    /// Start over for a new connection.
    pub fn reset(&self) {
        self.last_pong.write().at = Instant::now();
        self.awaiting_pong.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pong_clears_outstanding_ping() {
        let state = HeartbeatState::new();
        state.mark_ping_sent();
        assert!(!state.is_expired(Duration::from_secs(30)));
        let at = state.record_pong();
        assert_eq!(state.last_pong_at(), Some(at));
        assert!(!state.is_expired(Duration::ZERO));
    }

    #[test]
    fn silence_with_outstanding_ping_expires() {
        let state = HeartbeatState::new();
        state.last_pong.write().at = Instant::now()
            .checked_sub(Duration::from_secs(60))
            .unwrap();
        assert!(!state.is_expired(Duration::from_secs(30)));
        state.mark_ping_sent();
        assert!(state.is_expired(Duration::from_secs(30)));
        state.reset();
        assert!(!state.is_expired(Duration::from_secs(30)));
    }

    #[test]
    fn config_from_gateway_defaults() {
        let config = HeartbeatConfig::from_gateway_config(&GatewayConfig::default());
        assert_eq!(config.interval, Duration::from_secs(10));
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
