//! Configuration for `fleetwardd`.

use fleetops_types::EnvironmentKind;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Top-level daemon configuration, assembled from defaults, an optional
/// config file, and `FLEETOPS_`-prefixed environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub ddos: DdosSettings,

    #[serde(default)]
    pub rollback: RollbackSettings,

    #[serde(default)]
    pub environment: EnvironmentKind,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            ddos: DdosSettings::default(),
            rollback: RollbackSettings::default(),
            environment: EnvironmentKind::Development,
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,

    #[serde(default = "default_true")]
    pub enable_cors: bool,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8090".parse().unwrap(),
            enable_cors: true,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdosSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_ban_duration_secs")]
    pub ban_duration_secs: u64,

    #[serde(default = "default_ring_capacity")]
    pub ring_capacity: usize,
}

impl Default for DdosSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ban_duration_secs: default_ban_duration_secs(),
            ring_capacity: default_ring_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackSettings {
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

impl Default for RollbackSettings {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

fn default_ban_duration_secs() -> u64 {
    3600
}

fn default_ring_capacity() -> usize {
    1024
}

fn default_max_history() -> usize {
    50
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Layers defaults, an optional config file, then `FLEETOPS_`-prefixed
    /// environment variables, matching the teacher daemon's precedence.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("FLEETOPS")
                .separator("_")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_listen_port() {
        let config = DaemonConfig::default();
        assert_eq!(config.server.listen_addr.port(), 8090);
        assert!(config.ddos.enabled);
        assert_eq!(config.rollback.max_history, 50);
    }
}
