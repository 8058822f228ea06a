//! Application state module.
//!
//! Defines the shared application state that is passed to route handlers.

use shared::client::{InMemoryBackend, SearchBackend, SearchClient};
use shared::config::{BackendConfig, DEFAULT_ORGANIZATION};
use std::sync::Arc;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The search backend queries are sent to.
    backend: Arc<dyn SearchBackend>,
    /// Organization used when a request does not name one.
    organization: String,
}

impl AppState {
    /// Creates a new application state with the given backend.
    pub fn new(backend: Arc<dyn SearchBackend>, organization: impl Into<String>) -> Self {
        Self {
            backend,
            organization: organization.into(),
        }
    }

    /// Creates a state backed by a real OpenObserve client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built from `config`.
    pub fn from_config(config: BackendConfig) -> anyhow::Result<Self> {
        let organization = config.organization.clone();
        let client = SearchClient::new(config)?;
        Ok(Self::new(Arc::new(client), organization))
    }

    /// Creates a new application state with an in-memory backend.
    ///
    /// This is useful for development and testing.
    #[must_use]
    pub fn with_in_memory_backend() -> Self {
        Self::new(InMemoryBackend::new_shared(), DEFAULT_ORGANIZATION)
    }

    /// Returns a reference to the backend.
    #[must_use]
    pub fn backend(&self) -> &dyn SearchBackend {
        self.backend.as_ref()
    }

    /// Returns the default organization.
    #[must_use]
    pub fn organization(&self) -> &str {
        &self.organization
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_in_memory_backend()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_state_uses_default_organization() {
        let state = AppState::with_in_memory_backend();
        assert_eq!(state.organization(), "default");
    }

    #[test]
    fn test_from_config_keeps_organization() {
        let mut config = BackendConfig::new("http://127.0.0.1:5080");
        config.organization = "acme".to_string();
        let state = AppState::from_config(config).unwrap();
        assert_eq!(state.organization(), "acme");
    }

    #[tokio::test]
    async fn test_state_is_cloneable_and_shares_backend() {
        let backend = InMemoryBackend::new_shared();
        let state = AppState::new(backend.clone(), "default");
        let cloned = state.clone();

        backend.set_healthy(false);
        assert!(cloned.backend().health_check().await.is_err());
    }
}
