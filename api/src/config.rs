//! Server configuration module.
//!
//! Handles loading configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use shared::config::BackendConfig;
use std::net::SocketAddr;

/// Server configuration.
///
/// Configuration values can be set via environment variables:
/// - `O2BRIDGE_HOST`: The host address to bind to (default: "0.0.0.0")
/// - `O2BRIDGE_PORT`: The port to listen on (default: 8080)
/// - `O2BRIDGE_BACKEND_*`, `O2BRIDGE_ORGANIZATION`, `O2BRIDGE_TIMEOUT_SECS`:
///   see [`BackendConfig`]
#[derive(Debug, Clone)]
pub struct Config {
    /// The host address to bind to.
    pub host: String,
    /// The port to listen on.
    pub port: u16,
    /// How to reach the OpenObserve backend.
    pub backend: BackendConfig,
}

impl Config {
    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `O2BRIDGE_PORT` is set but cannot be parsed as a valid port number
    /// - `O2BRIDGE_TIMEOUT_SECS` is set but is not a positive number of seconds
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("O2BRIDGE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = std::env::var("O2BRIDGE_PORT")
            .ok()
            .map(|p| p.parse::<u16>())
            .transpose()
            .context("O2BRIDGE_PORT must be a valid port number")?
            .unwrap_or(8080);

        let backend = BackendConfig::from_env()?;

        Ok(Self {
            host,
            port,
            backend,
        })
    }

    /// Returns the socket address for binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the host and port cannot be parsed as a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid socket address {}:{}", self.host, self.port))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            backend: BackendConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.backend.organization, "default");
    }

    #[test]
    fn test_config_socket_addr() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 3000,
            ..Config::default()
        };
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:3000");
    }

    #[test]
    fn test_config_invalid_socket_addr() {
        let config = Config {
            host: "not a host".to_string(),
            ..Config::default()
        };
        assert!(config.socket_addr().is_err());
    }
}
