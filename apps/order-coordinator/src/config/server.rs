//! Agent API and metrics listener configuration.

use serde::Deserialize;

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// HTTP port for the agent API.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Prometheus exporter port, 0 disables it.
    #[serde(default)]
    pub metrics_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            http_port: default_http_port(),
            metrics_port: 0,
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

pub(crate) const fn default_http_port() -> u16 {
    8088
}
