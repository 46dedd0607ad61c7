//! Reconciliation configuration.

use serde::Deserialize;

/// Reconciliation configuration.
///
/// The grace period and missed-report threshold are required inputs.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconciliationConfig {
    /// Sweep interval in seconds.
    #[serde(default = "default_reconciliation_interval")]
    pub interval_secs: u64,
    /// Minimum time since an order's last update before it can be flagged.
    #[serde(default)]
    pub grace_period_secs: Option<u64>,
    /// Consecutive reports an order must be missing from before it is flagged.
    #[serde(default)]
    pub missed_report_threshold: Option<u32>,
    /// Seconds a finished order without anomalies stays tracked.
    #[serde(default = "default_terminal_retention")]
    pub terminal_retention_secs: u64,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_reconciliation_interval(),
            grace_period_secs: None,
            missed_report_threshold: None,
            terminal_retention_secs: default_terminal_retention(),
        }
    }
}

const fn default_reconciliation_interval() -> u64 {
    30
}

const fn default_terminal_retention() -> u64 {
    3600
}
