//! OpenObserve connection settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default OpenObserve base URL.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5080";

/// Default OpenObserve user.
pub const DEFAULT_BACKEND_USER: &str = "root@example.com";

/// Default organization.
pub const DEFAULT_ORGANIZATION: &str = "default";

/// Default overall request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Errors raised while reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable is set to a value that cannot be used.
    #[error("invalid value for {var}: '{value}'")]
    InvalidValue {
        /// Variable name.
        var: String,
        /// Offending value.
        value: String,
    },
}

/// How to reach and authenticate against OpenObserve.
///
/// Configuration values can be set via environment variables:
/// - `O2BRIDGE_BACKEND_URL`: base URL (default: `http://localhost:5080`)
/// - `O2BRIDGE_BACKEND_USER`: basic auth user (default: `root@example.com`)
/// - `O2BRIDGE_BACKEND_PASSWORD`: basic auth password (default: empty)
/// - `O2BRIDGE_ORGANIZATION`: organization queried when none is given (default: `default`)
/// - `O2BRIDGE_TIMEOUT_SECS`: overall request timeout (default: 60)
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL, without a trailing slash.
    pub url: String,
    /// Basic auth user.
    pub username: String,
    /// Basic auth password.
    pub password: String,
    /// Organization used when a request names none.
    pub organization: String,
    /// Overall deadline for one request.
    pub timeout: Duration,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("organization", &self.organization)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl BackendConfig {
    /// Creates a configuration for `url` with the default credentials,
    /// organization and timeout.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Sets the basic auth credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Sets the overall request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads the configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `O2BRIDGE_TIMEOUT_SECS` is set but is not a
    /// positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    ///
    /// # Errors
    ///
    /// Same as [`BackendConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("O2BRIDGE_BACKEND_URL").unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        let username =
            lookup("O2BRIDGE_BACKEND_USER").unwrap_or_else(|| DEFAULT_BACKEND_USER.to_string());
        let password = lookup("O2BRIDGE_BACKEND_PASSWORD").unwrap_or_default();
        let organization =
            lookup("O2BRIDGE_ORGANIZATION").unwrap_or_else(|| DEFAULT_ORGANIZATION.to_string());

        let timeout_secs = match lookup("O2BRIDGE_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "O2BRIDGE_TIMEOUT_SECS".to_string(),
                        value: raw,
                    })
                }
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            username,
            password,
            organization,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BACKEND_URL.to_string(),
            username: DEFAULT_BACKEND_USER.to_string(),
            password: String::new(),
            organization: DEFAULT_ORGANIZATION.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}
