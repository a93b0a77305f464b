//! Host settings
//!
//! Read from the `host` section of the app config:
//!
//! ```yaml
//! host:
//!   bind_address: 0.0.0.0
//!   bind_port: 7007
//!   watch_interval_secs: 10
//! ```

use branchcount_store::ConfigSource;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Config path of the host section
pub const HOST_CONFIG_PATH: &str = "host";

/// Host configuration error
#[derive(Debug, Error)]
pub enum HostConfigError {
    /// The section does not match the expected shape
    #[error("Invalid host configuration: {0}")]
    Invalid(#[from] serde_json::Error),

    /// A field holds an unusable value
    #[error("Invalid host configuration field '{0}'")]
    InvalidField(String),
}

/// HTTP server and config watcher settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    /// Bind address (e.g., "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Bind port (e.g., 7007)
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// How often the config file is checked for changes (default: 10)
    #[serde(default = "default_watch_interval")]
    pub watch_interval_secs: u64,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    7007
}

fn default_watch_interval() -> u64 {
    10
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            watch_interval_secs: default_watch_interval(),
        }
    }
}

impl HostConfig {
    /// Read the `host` section; an absent section yields the defaults
    pub fn from_config(config: &dyn ConfigSource) -> Result<Self, HostConfigError> {
        let host: HostConfig = match config.get_optional(HOST_CONFIG_PATH) {
            Some(section) => serde_json::from_value(section)?,
            None => HostConfig::default(),
        };

        if host.bind_address.trim().is_empty() {
            return Err(HostConfigError::InvalidField("bind_address".to_string()));
        }
        if host.watch_interval_secs == 0 {
            return Err(HostConfigError::InvalidField("watch_interval_secs".to_string()));
        }
        Ok(host)
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }

    /// Config watcher poll interval
    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs)
    }
}
