//! Server configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Errors raised while loading or validating a [`Config`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config is not valid JSON or has the wrong shape.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Port 0 is not a valid listening port.
    #[error("invalid port number, provide a valid port number")]
    InvalidPort,

    /// The host is neither an IP address nor `localhost`.
    #[error("invalid host '{0}', expected an IP address or 'localhost'")]
    InvalidHost(String),
}

/// Listener settings, read from a JSON file with camelCase keys.
///
/// ```json
/// { "environment": "production", "host": "0.0.0.0", "port": 9000,
///   "readTimeoutSecs": 10, "shutdownTimeoutSecs": 20 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub environment: String,
    pub host: String,
    pub port: u16,
    /// Time allowed for a client to send the request headers.
    pub read_timeout_secs: u64,
    /// Time allowed for in-flight connections to finish after shutdown.
    pub shutdown_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8080,
            read_timeout_secs: 15,
            shutdown_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Reads, parses and validates the config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Parses and validates a JSON config. Missing keys take their defaults.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        self.ip()?;
        Ok(())
    }

    /// The address to listen on.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        Ok(SocketAddr::new(self.ip()?, self.port))
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    fn ip(&self) -> Result<IpAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(IpAddr::V4(Ipv4Addr::LOCALHOST));
        }
        self.host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.host.clone()))
    }
}
