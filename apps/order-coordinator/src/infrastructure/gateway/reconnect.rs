//! Bounded exponential backoff for gateway reconnection.

use std::time::Duration;

use rand::Rng;

use crate::config::GatewayConfig;

/// Reconnect backoff settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Delay cap.
    pub max_delay: Duration,
    /// Growth factor per attempt.
    pub multiplier: f64,
    /// Jitter as a fraction of the delay (0.1 = ±10%).
    pub jitter_factor: f64,
    /// Attempts before giving up. Always bounded.
    pub max_attempts: u32,
}

impl ReconnectConfig {
    /// Settings from the gateway section of the configuration.
    #[must_use]
    pub fn from_gateway_config(config: &GatewayConfig) -> Self {
        Self {
            initial_delay: Duration::from_millis(config.reconnect_initial_delay_ms),
            max_delay: Duration::from_millis(config.reconnect_max_delay_ms),
            multiplier: config.reconnect_multiplier,
            jitter_factor: 0.1,
            max_attempts: config.max_reconnect_attempts.max(1),
        }
    }
}

/// Stateful backoff sequence for one reconnect episode.
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    attempts: u32,
}

impl ReconnectPolicy {
    /// Start a new episode.
    #[must_use]
    pub const fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            attempts: 0,
        }
    }

    /// Delay before the next attempt, or `None` once attempts are spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.config.max_attempts {
            return None;
        }
        let exponent = self.attempts.min(32) as i32;
        self.attempts += 1;

        let base_ms = self.config.initial_delay.as_millis() as f64
            * self.config.multiplier.max(1.0).powi(exponent);
        let capped_ms = base_ms.min(self.config.max_delay.as_millis() as f64);
        Some(self.jitter(capped_ms))
    }

    /// Attempts made in this episode.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Start over after a successful connect.
    pub const fn reset(&mut self) {
        self.attempts = 0;
    }

    fn jitter(&self, millis: f64) -> Duration {
        if millis <= 0.0 {
            return Duration::ZERO;
        }
        let range = millis * self.config.jitter_factor;
        let offset = if range > 0.0 {
            rand::rng().random_range(-range..=range)
        } else {
            0.0
        };
        Duration::from_millis((millis + offset).max(1.0) as u64)
    }
}
