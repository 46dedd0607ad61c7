//! Configuration for the order coordinator.
//!
//! Loading order: YAML file, `${VAR}` / `${VAR:-default}` interpolation,
//! `FUTU_*` / `COORDINATOR_*` environment overrides, validation.
//!
//! # Usage
//!
//! ```rust,ignore
//! use order_coordinator::config::load_config;
//!
//! let config = load_config(Some("config.yaml"))?;
//! let guard = config.environment_guard()?;
//! let settings = config.coordinator_settings()?;
//! ```

mod environment;
mod gateway;
mod market_data;
mod reconciliation;
mod server;

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub use environment::EnvironmentConfig;
pub use gateway::{GatewayConfig, TradePassword};
pub use market_data::MarketDataConfig;
pub use reconciliation::ReconciliationConfig;
pub use server::ServerConfig;

use crate::application::coordinator::CoordinatorSettings;
use crate::application::retry::RetryPolicy;
use crate::domain::environment::{EnvironmentGuard, TradeEnvironment};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "COORDINATOR_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),

    /// A required value was not provided.
    #[error("Missing required config value '{key}' (set it in the config file or via {env_var})")]
    MissingValue {
        /// Config key.
        key: &'static str,
        /// Environment variable that can supply it.
        env_var: &'static str,
    },

    /// A runtime dependency of the selected environment is absent.
    #[error("{what} is required in the {environment} environment (set {env_var})")]
    MissingDependency {
        /// What is missing.
        what: &'static str,
        /// Environment that needs it.
        environment: TradeEnvironment,
        /// Environment variable that can supply it.
        env_var: &'static str,
    },

    /// An environment override could not be parsed.
    #[error("Invalid value for environment variable {name}: '{value}'")]
    InvalidEnvVar {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Gateway connection.
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Trade environment and markets.
    #[serde(default)]
    pub environment: EnvironmentConfig,
    /// Market data cache and sanity band.
    #[serde(default)]
    pub market_data: MarketDataConfig,
    /// Reconciliation sweep.
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
    /// Agent API server.
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Build the environment guard. Fails when the mode is absent or unknown.
    pub fn environment_guard(&self) -> Result<EnvironmentGuard, ConfigError> {
        let mode = self
            .environment
            .mode
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .ok_or(ConfigError::MissingValue {
                key: "environment.mode",
                env_var: "FUTU_TRADE_ENV",
            })?;
        EnvironmentGuard::from_config(Some(mode))
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    /// Check that everything `environment` needs at runtime is present.
    ///
    /// REAL trading cannot unlock without a trade password.
    pub fn check_dependencies(&self, environment: TradeEnvironment) -> Result<(), ConfigError> {
        if environment.is_real() && self.gateway.trade_password.is_none() {
            return Err(ConfigError::MissingDependency {
                what: "gateway.trade_password",
                environment,
                env_var: "FUTU_TRADE_PASSWORD",
            });
        }
        Ok(())
    }

    /// Settings for the order coordinator.
    pub fn coordinator_settings(&self) -> Result<CoordinatorSettings, ConfigError> {
        let grace_period_secs =
            self.reconciliation
                .grace_period_secs
                .ok_or(ConfigError::MissingValue {
                    key: "reconciliation.grace_period_secs",
                    env_var: "COORDINATOR_RECONCILE_GRACE_SECS",
                })?;
        let missed_report_threshold =
            self.reconciliation
                .missed_report_threshold
                .ok_or(ConfigError::MissingValue {
                    key: "reconciliation.missed_report_threshold",
                    env_var: "COORDINATOR_RECONCILE_MISSED_REPORTS",
                })?;

        Ok(CoordinatorSettings {
            default_market: self.environment.market,
            enabled_markets: self.environment.markets.clone(),
            staleness_threshold: self.market_data.staleness_threshold(),
            deviation_band_bps: self.market_data.deviation_band_bps,
            extended_hours: self
                .market_data
                .extended_hours
                .iter()
                .cloned()
                .collect::<HashSet<_>>(),
            grace_period: Duration::from_secs(grace_period_secs),
            missed_report_threshold,
            terminal_retention: Duration::from_secs(self.reconciliation.terminal_retention_secs),
            retry: RetryPolicy::new(
                self.gateway.send_max_attempts,
                Duration::from_millis(self.gateway.reconnect_initial_delay_ms.min(1000)),
                Duration::from_secs(5),
            ),
        })
    }
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation
/// and overrides.
///
/// With no explicit path, `config.yaml` is used when present; otherwise the
/// configuration comes from defaults and the environment alone.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let contents = match path {
        Some(path) => read_config_file(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => read_config_file(DEFAULT_CONFIG_PATH)?,
        None => String::new(),
    };

    let mut config = parse_yaml(&contents)?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config)?;
    Ok(config)
}

/// Load configuration from a YAML string without environment overrides.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let config = parse_yaml(yaml)?;
    validate_config(&config)?;
    Ok(config)
}

fn read_config_file(path: &str) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })
}

fn parse_yaml(contents: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(contents);
    if interpolated.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml_bw::from_str(&interpolated)?)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map_or("", |m| m.as_str());
        match std::env::var(&cap[1]) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

/// Apply `FUTU_*` and `COORDINATOR_*` overrides using `lookup` to read
/// variables. Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(host) = get("FUTU_HOST") {
        config.gateway.host = host;
    }
    if let Some(port) = get("FUTU_PORT") {
        config.gateway.port = parse_env("FUTU_PORT", &port)?;
    }
    if let Some(password) = get("FUTU_TRADE_PASSWORD") {
        config.gateway.trade_password = Some(TradePassword::new(password));
    }
    if let Some(mode) = get("FUTU_TRADE_ENV") {
        config.environment.mode = Some(mode);
    }
    if let Some(market) = get("FUTU_MARKET") {
        config.environment.market = parse_env("FUTU_MARKET", &market)?;
    }
    if let Some(port) = get("COORDINATOR_HTTP_PORT") {
        config.server.http_port = parse_env("COORDINATOR_HTTP_PORT", &port)?;
    }
    if let Some(grace) = get("COORDINATOR_RECONCILE_GRACE_SECS") {
        config.reconciliation.grace_period_secs =
            Some(parse_env("COORDINATOR_RECONCILE_GRACE_SECS", &grace)?);
    }
    if let Some(threshold) = get("COORDINATOR_RECONCILE_MISSED_REPORTS") {
        config.reconciliation.missed_report_threshold =
            Some(parse_env("COORDINATOR_RECONCILE_MISSED_REPORTS", &threshold)?);
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvVar {
        name,
        value: value.to_string(),
    })
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    config.environment_guard()?;
    config.coordinator_settings()?;

    if config.gateway.host.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "gateway.host must not be empty".to_string(),
        ));
    }
    if config.gateway.port == 0 {
        return Err(ConfigError::ValidationError(
            "gateway.port must be non-zero".to_string(),
        ));
    }
    if config.gateway.send_max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "gateway.send_max_attempts must be at least 1".to_string(),
        ));
    }
    if config.gateway.reconnect_multiplier < 1.0 {
        return Err(ConfigError::ValidationError(
            "gateway.reconnect_multiplier must be at least 1.0".to_string(),
        ));
    }
    if config.gateway.heartbeat_timeout_secs < config.gateway.heartbeat_interval_secs {
        return Err(ConfigError::ValidationError(
            "gateway.heartbeat_timeout_secs must not be shorter than heartbeat_interval_secs"
                .to_string(),
        ));
    }

    if config.environment.markets.is_empty() {
        return Err(ConfigError::ValidationError(
            "environment.markets must not be empty".to_string(),
        ));
    }
    if !config.environment.markets.contains(&config.environment.market) {
        return Err(ConfigError::ValidationError(format!(
            "environment.market {} is not in environment.markets",
            config.environment.market
        )));
    }

    if config.market_data.staleness_threshold_ms == 0 {
        return Err(ConfigError::ValidationError(
            "market_data.staleness_threshold_ms must be positive".to_string(),
        ));
    }
    if config.market_data.deviation_band_bps == 0 || config.market_data.deviation_band_bps > 10_000
    {
        return Err(ConfigError::ValidationError(
            "market_data.deviation_band_bps must be between 1 and 10000".to_string(),
        ));
    }

    if config.reconciliation.missed_report_threshold == Some(0) {
        return Err(ConfigError::ValidationError(
            "reconciliation.missed_report_threshold must be at least 1".to_string(),
        ));
    }
    if config.reconciliation.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "reconciliation.interval_secs must be positive".to_string(),
        ));
    }

    if config.server.metrics_port != 0 && config.server.metrics_port == config.server.http_port {
        return Err(ConfigError::ValidationError(
            "server.metrics_port and server.http_port must be different".to_string(),
        ));
    }

    Ok(())
}
