//! Gateway (Futu OpenD) connection configuration.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Trade unlock password. Never printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradePassword(String);

impl TradePassword {
    /// Wrap a password.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw password, for the unlock command only.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TradePassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for TradePassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Gateway connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Gateway host.
    #[serde(default = "default_host")]
    pub host: String,
    /// Gateway port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    /// Heartbeat ping interval in seconds.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
    /// Time without a heartbeat reply before the session degrades, in seconds.
    #[serde(default = "default_heartbeat_timeout")]
    pub heartbeat_timeout_secs: u64,
    /// First reconnect delay in milliseconds.
    #[serde(default = "default_reconnect_initial_delay")]
    pub reconnect_initial_delay_ms: u64,
    /// Reconnect delay cap in milliseconds.
    #[serde(default = "default_reconnect_max_delay")]
    pub reconnect_max_delay_ms: u64,
    /// Reconnect delay multiplier.
    #[serde(default = "default_reconnect_multiplier")]
    pub reconnect_multiplier: f64,
    /// Reconnect attempts per `ensure_connected` call.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// Attempts per gateway request on transient failure.
    #[serde(default = "default_send_max_attempts")]
    pub send_max_attempts: u32,
    /// Trade unlock password.
    #[serde(default)]
    pub trade_password: Option<TradePassword>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: default_request_timeout(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            heartbeat_timeout_secs: default_heartbeat_timeout(),
            reconnect_initial_delay_ms: default_reconnect_initial_delay(),
            reconnect_max_delay_ms: default_reconnect_max_delay(),
            reconnect_multiplier: default_reconnect_multiplier(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            send_max_attempts: default_send_max_attempts(),
            trade_password: None,
        }
    }
}

impl GatewayConfig {
    /// `host:port` of the gateway.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Heartbeat interval.
    #[must_use]
    pub const fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Heartbeat timeout.
    #[must_use]
    pub const fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

pub(crate) const fn default_port() -> u16 {
    11111
}

const fn default_connect_timeout() -> u64 {
    2000
}

const fn default_request_timeout() -> u64 {
    5000
}

const fn default_heartbeat_interval() -> u64 {
    10
}

const fn default_heartbeat_timeout() -> u64 {
    30
}

const fn default_reconnect_initial_delay() -> u64 {
    500
}

const fn default_reconnect_max_delay() -> u64 {
    30_000
}

const fn default_reconnect_multiplier() -> f64 {
    2.0
}

const fn default_max_reconnect_attempts() -> u32 {
    5
}

const fn default_send_max_attempts() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_is_redacted() {
        let password = TradePassword::new("123456");
        assert_eq!(format!("{password:?}"), "[REDACTED]");
        assert_eq!(format!("{password}"), "[REDACTED]");
        assert_eq!(password.expose(), "123456");

        let config = GatewayConfig {
            trade_password: Some(password),
            ..GatewayConfig::default()
        };
        assert!(!format!("{config:?}").contains("123456"));
    }

    #[test]
    fn defaults_point_at_local_opend() {
        let config = GatewayConfig::default();
        assert_eq!(config.address(), "127.0.0.1:11111");
        assert_eq!(config.connect_timeout(), Duration::from_secs(2));
    }
}
