//! In-memory search backend.
//!
//! Serves canned envelopes and stream listings and records every search it
//! receives. Used wherever the pipeline must run without an OpenObserve.

use super::{AcquireError, SearchBackend};
use crate::models::{ResultEnvelope, SearchRequestBody, SearchRequestParams, StreamInfo, StreamType};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// A search request as seen by [`InMemoryBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSearch {
    /// Query-string parameters.
    pub params: SearchRequestParams,
    /// Request body.
    pub body: SearchRequestBody,
    /// Whether the streaming protocol was requested.
    pub streaming: bool,
}

#[derive(Debug, Default)]
struct State {
    default_envelope: ResultEnvelope,
    envelopes: HashMap<String, ResultEnvelope>,
    failures: HashMap<String, u16>,
    streams: HashMap<StreamType, Vec<StreamInfo>>,
    healthy: bool,
    searches: Vec<RecordedSearch>,
}

/// Canned-response backend.
///
/// Searches are answered by exact SQL text first, then with the default
/// envelope (empty unless set).
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    state: Arc<RwLock<State>>,
}

impl InMemoryBackend {
    /// Creates a healthy backend with no data.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State {
                healthy: true,
                ..State::default()
            })),
        }
    }

    /// Creates a new backend wrapped in an Arc.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answers every search without a specific response with `envelope`.
    pub fn set_default_envelope(&self, envelope: ResultEnvelope) {
        self.write().default_envelope = envelope;
    }

    /// Answers searches whose SQL is exactly `sql` with `envelope`.
    pub fn set_envelope(&self, sql: impl Into<String>, envelope: ResultEnvelope) {
        self.write().envelopes.insert(sql.into(), envelope);
    }

    /// Fails searches whose SQL is exactly `sql` with the given HTTP status.
    pub fn fail_search(&self, sql: impl Into<String>, status: u16) {
        self.write().failures.insert(sql.into(), status);
    }

    /// Sets the streams listed for a kind.
    pub fn set_streams(&self, stream_type: StreamType, streams: Vec<StreamInfo>) {
        self.write().streams.insert(stream_type, streams);
    }

    /// Sets the outcome of health checks.
    pub fn set_healthy(&self, healthy: bool) {
        self.write().healthy = healthy;
    }

    /// Every search received so far, in arrival order.
    #[must_use]
    pub fn searches(&self) -> Vec<RecordedSearch> {
        self.read().searches.clone()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchBackend for InMemoryBackend {
    async fn acquire(
        &self,
        params: &SearchRequestParams,
        body: &SearchRequestBody,
        streaming: bool,
    ) -> Result<ResultEnvelope, AcquireError> {
        let mut state = self.write();
        state.searches.push(RecordedSearch {
            params: params.clone(),
            body: body.clone(),
            streaming,
        });

        if let Some(status) = state.failures.get(&body.query.sql) {
            return Err(AcquireError::Status {
                status: *status,
                body: (!streaming).then(|| "search failed".to_string()),
            });
        }

        Ok(state
            .envelopes
            .get(&body.query.sql)
            .unwrap_or(&state.default_envelope)
            .clone())
    }

    async fn list_streams(
        &self,
        _organization: &str,
        stream_type: StreamType,
    ) -> Result<Vec<StreamInfo>, AcquireError> {
        Ok(self
            .read()
            .streams
            .get(&stream_type)
            .cloned()
            .unwrap_or_default())
    }

    async fn health_check(&self) -> Result<(), AcquireError> {
        if self.read().healthy {
            Ok(())
        } else {
            Err(AcquireError::Status {
                status: 503,
                body: Some("unavailable".to_string()),
            })
        }
    }
}
