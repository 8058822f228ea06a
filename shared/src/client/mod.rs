//! OpenObserve search client.
//!
//! The [`SearchBackend`] trait is the seam between the query pipeline and the
//! backend. [`SearchClient`] talks to a real OpenObserve over HTTP;
//! [`InMemoryBackend`] serves canned responses.
//!
//! A search result can be acquired over two wire protocols:
//! - buffered: `POST /api/{org}/_search`, the whole body is the envelope;
//! - streaming: `POST /api/{org}/_search_stream`, a line-framed event stream
//!   in which the envelope follows an `event: search_response_hits` line.

pub mod memory;
pub mod sse;

pub use memory::{InMemoryBackend, RecordedSearch};

use crate::config::BackendConfig;
use crate::models::{
    ListStreamResponse, ResultEnvelope, SearchRequestBody, SearchRequestParams, StreamInfo,
    StreamType,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::{header, Client, RequestBuilder, Response, StatusCode, Url};
use sse::StreamDecoder;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to the backend.
#[derive(Debug, Error)]
pub enum AcquireError {
    /// The backend answered with a status other than 200.
    #[error("http response status code: {status}{}", format_body(.body.as_deref()))]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, when it was read.
        body: Option<String>,
    },

    /// The request did not complete within the deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The event stream ended without a hits event.
    #[error("no result event found")]
    NoResultEvent,

    /// The event stream was structurally invalid.
    #[error("malformed event stream: {0}")]
    MalformedStream(String),

    /// The payload was not a valid envelope.
    #[error("failed to decode search response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Connection or protocol failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The configured base URL cannot be used.
    #[error("invalid backend url: {0}")]
    InvalidUrl(String),
}

fn format_body(body: Option<&str>) -> String {
    body.map(|b| format!(", body: {b}")).unwrap_or_default()
}

/// Operations the pipeline needs from a search backend.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Runs one search and returns its envelope.
    ///
    /// `streaming` selects the `_search_stream` protocol.
    ///
    /// # Errors
    ///
    /// Returns an `AcquireError` on non-200 responses, timeouts, transport
    /// failures and undecodable or incomplete payloads.
    async fn acquire(
        &self,
        params: &SearchRequestParams,
        body: &SearchRequestBody,
        streaming: bool,
    ) -> Result<ResultEnvelope, AcquireError>;

    /// Lists the streams of one kind, sorted by name, with their schemas.
    ///
    /// # Errors
    ///
    /// Returns an `AcquireError` when the listing request fails.
    async fn list_streams(
        &self,
        organization: &str,
        stream_type: StreamType,
    ) -> Result<Vec<StreamInfo>, AcquireError>;

    /// Checks that the backend is reachable and accepts the credentials.
    ///
    /// # Errors
    ///
    /// Returns an `AcquireError` when the cluster endpoint does not answer 200.
    async fn health_check(&self) -> Result<(), AcquireError>;
}

/// HTTP client for an OpenObserve instance.
#[derive(Debug, Clone)]
pub struct SearchClient {
    http: Client,
    config: BackendConfig,
    base_url: Url,
}

impl SearchClient {
    /// Creates a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns `AcquireError::InvalidUrl` when the base URL does not parse,
    /// or `AcquireError::Transport` when the HTTP client cannot be built.
    pub fn new(config: BackendConfig) -> Result<Self, AcquireError> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| AcquireError::InvalidUrl(format!("{}: {e}", config.url)))?;
        if base_url.cannot_be_a_base() {
            return Err(AcquireError::InvalidUrl(config.url));
        }
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            config,
            base_url,
        })
    }

    /// The configuration this client was built from.
    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.as_str().trim_end_matches('/'))
    }

    fn authorization(&self) -> String {
        let credentials = format!("{}:{}", self.config.username, self.config.password);
        format!("Basic {}", BASE64.encode(credentials))
    }

    fn search_request(
        &self,
        endpoint: &str,
        params: &SearchRequestParams,
        body: &SearchRequestBody,
    ) -> RequestBuilder {
        let url = self.endpoint(&format!("/api/{}/{endpoint}", params.organization));
        self.http
            .post(url)
            .query(&[
                ("search_type", params.search_type.as_str()),
                ("type", params.stream_type.as_str()),
                ("use_cache", if params.use_cache { "true" } else { "false" }),
            ])
            .header(header::AUTHORIZATION, self.authorization())
            .json(body)
    }

    /// Runs `operation` under the configured deadline.
    async fn with_deadline<T, F>(&self, operation: F) -> Result<T, AcquireError>
    where
        F: Future<Output = Result<T, AcquireError>>,
    {
        let deadline = self.config.timeout;
        tokio::time::timeout(deadline, operation)
            .await
            .map_err(|_| AcquireError::Timeout(deadline))?
    }

    async fn search_buffered(
        &self,
        params: &SearchRequestParams,
        body: &SearchRequestBody,
    ) -> Result<ResultEnvelope, AcquireError> {
        let response = self.search_request("_search", params, body).send().await?;
        let response = ensure_ok(response, true).await?;
        let bytes = response.bytes().await?;
        let envelope: ResultEnvelope = serde_json::from_slice(&bytes)?;
        Ok(envelope)
    }

    async fn search_streaming(
        &self,
        params: &SearchRequestParams,
        body: &SearchRequestBody,
    ) -> Result<ResultEnvelope, AcquireError> {
        let response = self
            .search_request("_search_stream", params, body)
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        let mut response = ensure_ok(response, false).await?;

        let mut decoder = StreamDecoder::new();
        while let Some(chunk) = response.chunk().await? {
            if let Some(envelope) = decoder.push(&chunk)? {
                return Ok(envelope);
            }
        }
        decoder.finish()
    }
}

/// Turns a non-200 response into `AcquireError::Status`, reading the body
/// only when `read_body` is set.
async fn ensure_ok(response: Response, read_body: bool) -> Result<Response, AcquireError> {
    let status = response.status();
    if status == StatusCode::OK {
        return Ok(response);
    }
    let body = if read_body {
        response.text().await.ok()
    } else {
        None
    };
    Err(AcquireError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl SearchBackend for SearchClient {
    async fn acquire(
        &self,
        params: &SearchRequestParams,
        body: &SearchRequestBody,
        streaming: bool,
    ) -> Result<ResultEnvelope, AcquireError> {
        tracing::debug!(
            organization = %params.organization,
            stream_type = %params.stream_type,
            streaming,
            sql = %body.query.sql,
            "Sending search request"
        );

        let result = if streaming {
            self.with_deadline(self.search_streaming(params, body)).await
        } else {
            self.with_deadline(self.search_buffered(params, body)).await
        };

        match &result {
            Ok(envelope) => tracing::debug!(
                hits = envelope.hits.len(),
                took_ms = envelope.took,
                "Search completed"
            ),
            Err(e) => tracing::warn!(error = %e, "Search failed"),
        }
        result
    }

    async fn list_streams(
        &self,
        organization: &str,
        stream_type: StreamType,
    ) -> Result<Vec<StreamInfo>, AcquireError> {
        let url = self.endpoint(&format!("/api/{organization}/streams"));
        let request = self
            .http
            .get(url)
            .query(&[
                ("type", stream_type.as_str()),
                ("sort", "name"),
                ("asc", "true"),
                ("fetchSchema", "true"),
            ])
            .header(header::AUTHORIZATION, self.authorization());

        let listing = self
            .with_deadline(async {
                let response = ensure_ok(request.send().await?, true).await?;
                let bytes = response.bytes().await?;
                let listing: ListStreamResponse = serde_json::from_slice(&bytes)?;
                Ok::<_, AcquireError>(listing)
            })
            .await?;

        tracing::debug!(
            organization = %organization,
            stream_type = %stream_type,
            streams = listing.list.len(),
            "Listed streams"
        );
        Ok(listing.list)
    }

    async fn health_check(&self) -> Result<(), AcquireError> {
        let request = self
            .http
            .get(self.endpoint("/api/clusters"))
            .header(header::AUTHORIZATION, self.authorization());

        self.with_deadline(async {
            ensure_ok(request.send().await?, true).await?;
            Ok::<_, AcquireError>(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchQuery;
    use axum::{
        extract::{Path, Query},
        http::{HeaderMap, StatusCode as AxumStatus},
        response::IntoResponse,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    const SSE_BODY: &str = concat!(
        "event: search_response_metadata\n",
        "data: {\"took\": 3}\n",
        "\n",
        "event: search_response_hits\n",
        "data: {\"hits\": [{\"level\": \"error\", \"_timestamp\": 100}], ",
        "\"total\": 1, \"took\": 3}\n",
        "\n",
    );

    async fn search(
        Path(org): Path<String>,
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> impl IntoResponse {
        if org == "broken" {
            return (AxumStatus::BAD_REQUEST, "bad sql".to_string()).into_response();
        }
        if org == "slow" {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        Json(json!({
            "hits": [{
                "org": org,
                "search_type": query.get("search_type"),
                "type": query.get("type"),
                "use_cache": query.get("use_cache"),
                "auth": headers.get("authorization").and_then(|v| v.to_str().ok()),
                "sql": body["query"]["sql"],
                "timeout": body["timeout"],
            }],
            "total": 1,
            "took": 7
        }))
        .into_response()
    }

    async fn search_stream(Path(org): Path<String>, headers: HeaderMap) -> impl IntoResponse {
        let accept = headers
            .get("accept")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        match org.as_str() {
            "broken" => (AxumStatus::INTERNAL_SERVER_ERROR, "boom").into_response(),
            "nomarker" => "event: progress\ndata: {}\n".into_response(),
            _ if accept == "text/event-stream" => SSE_BODY.into_response(),
            _ => (AxumStatus::NOT_ACCEPTABLE, "").into_response(),
        }
    }

    async fn streams(
        Path(org): Path<String>,
        Query(query): Query<HashMap<String, String>>,
    ) -> impl IntoResponse {
        Json(json!({
            "list": [{
                "name": format!("{org}_{}", query.get("type").cloned().unwrap_or_default()),
                "storage_type": "disk",
                "stream_type": query.get("type"),
                "schema": [
                    {"name": "sort", "type": query.get("sort")},
                    {"name": "fetch", "type": query.get("fetchSchema")}
                ]
            }]
        }))
    }

    async fn spawn_backend() -> String {
        let app = Router::new()
            .route("/api/{org}/_search", post(search))
            .route("/api/{org}/_search_stream", post(search_stream))
            .route("/api/{org}/streams", get(streams))
            .route("/api/clusters", get(|| async { Json(json!({"clusters": []})) }));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn request(org: &str) -> (SearchRequestParams, SearchRequestBody) {
        (
            SearchRequestParams::new(org, StreamType::Logs),
            SearchRequestBody::new(SearchQuery {
                sql: "SELECT * FROM default".to_string(),
                start_time: 0,
                end_time: 1,
                from: 0,
                size: 200,
            }),
        )
    }

    fn client(url: &str) -> SearchClient {
        SearchClient::new(BackendConfig::new(url).with_credentials("user", "pass")).unwrap()
    }

    #[tokio::test]
    async fn test_buffered_search_sends_params_auth_and_body() {
        let url = spawn_backend().await;
        let (params, body) = request("acme");

        let envelope = client(&url).acquire(&params, &body, false).await.unwrap();

        assert_eq!(envelope.total, 1);
        assert_eq!(envelope.took, 7);
        let hit = serde_json::to_value(&envelope.hits[0]).unwrap();
        assert_eq!(hit["org"], "acme");
        assert_eq!(hit["search_type"], "ui");
        assert_eq!(hit["type"], "logs");
        assert_eq!(hit["use_cache"], "true");
        assert_eq!(hit["auth"], format!("Basic {}", BASE64.encode("user:pass")));
        assert_eq!(hit["sql"], "SELECT * FROM default");
        assert_eq!(hit["timeout"], 60);
    }

    #[tokio::test]
    async fn test_buffered_search_non_200_keeps_body() {
        let url = spawn_backend().await;
        let (params, body) = request("broken");

        let err = client(&url).acquire(&params, &body, false).await.unwrap_err();
        match err {
            AcquireError::Status { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body.as_deref(), Some("bad sql"));
            }
            other => panic!("Expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_streaming_search_extracts_hits_event() {
        let url = spawn_backend().await;
        let (params, body) = request("acme");

        let envelope = client(&url).acquire(&params, &body, true).await.unwrap();
        assert_eq!(envelope.total, 1);
        assert_eq!(envelope.hits.len(), 1);
    }

    #[tokio::test]
    async fn test_streaming_search_non_200_has_no_body() {
        let url = spawn_backend().await;
        let (params, body) = request("broken");

        let err = client(&url).acquire(&params, &body, true).await.unwrap_err();
        assert!(matches!(
            err,
            AcquireError::Status {
                status: 500,
                body: None
            }
        ));
    }

    #[tokio::test]
    async fn test_streaming_search_without_marker() {
        let url = spawn_backend().await;
        let (params, body) = request("nomarker");

        let err = client(&url).acquire(&params, &body, true).await.unwrap_err();
        assert_eq!(err.to_string(), "no result event found");
    }

    #[tokio::test]
    async fn test_search_timeout() {
        let url = spawn_backend().await;
        let (params, body) = request("slow");
        let client = SearchClient::new(
            BackendConfig::new(&url).with_timeout(Duration::from_millis(100)),
        )
        .unwrap();

        let err = client.acquire(&params, &body, false).await.unwrap_err();
        assert!(matches!(err, AcquireError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_list_streams_query() {
        let url = spawn_backend().await;

        let streams = client(&url)
            .list_streams("acme", StreamType::Metrics)
            .await
            .unwrap();

        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].name, "acme_metrics");
        assert_eq!(streams[0].schema[0].field_type, "name");
        assert_eq!(streams[0].schema[1].field_type, "true");
    }

    #[tokio::test]
    async fn test_health_check() {
        let url = spawn_backend().await;
        assert!(client(&url).health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(&format!("http://{addr}"))
            .health_check()
            .await
            .unwrap_err();
        assert!(matches!(err, AcquireError::Transport(_)));
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            SearchClient::new(BackendConfig::new("not a url")),
            Err(AcquireError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_status_error_message() {
        let err = AcquireError::Status {
            status: 401,
            body: Some("unauthorized".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "http response status code: 401, body: unauthorized"
        );
        let err = AcquireError::Status {
            status: 500,
            body: None,
        };
        assert_eq!(err.to_string(), "http response status code: 500");
    }
}
