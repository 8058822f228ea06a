//! Query pipeline.
//!
//! Runs one host query end to end: filter injection, analysis, acquisition
//! and shaping. [`execute_batch`] fans a batch of queries out with bounded
//! concurrency; a failing query never affects its siblings.

use crate::client::{AcquireError, SearchBackend};
use crate::models::{
    SearchQuery, SearchRequestBody, SearchRequestParams, ShapedFrame, StreamType,
    DEFAULT_RESULT_SIZE, DEFAULT_SEARCH_TYPE,
};
use crate::query::{
    analyze, inject_filters, Analysis, CommandError, FilterCondition, ListStreamsCommand,
    ParseError,
};
use crate::shaper::{shape, streams_frame, ShapeError};
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use validator::Validate;

/// Maximum number of queries of one batch in flight at once.
pub const MAX_CONCURRENT_QUERIES: usize = 10;

fn default_search_type() -> String {
    DEFAULT_SEARCH_TYPE.to_string()
}

fn default_true() -> bool {
    true
}

/// One query as supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QueryModel {
    /// Identifies the query within its batch.
    #[serde(default)]
    pub ref_id: String,

    /// Kind of stream queried.
    #[serde(default)]
    pub query_type: StreamType,

    /// Backend search type.
    #[serde(default = "default_search_type")]
    pub search_type: String,

    /// Whether the backend may serve cached results.
    #[serde(default = "default_true")]
    pub use_cache: bool,

    /// Use the streaming protocol instead of the buffered one.
    #[serde(default)]
    pub enable_sse: bool,

    /// Query text as written by the user.
    #[validate(length(min = 1, message = "SQL cannot be empty"))]
    pub raw_sql: String,

    /// Offset of the first hit.
    #[serde(default)]
    #[validate(range(min = 0, message = "Offset cannot be negative"))]
    pub from: i64,

    /// Requested number of hits, 0 for the default.
    #[serde(default)]
    #[validate(range(min = 0, message = "Size cannot be negative"))]
    pub size: i64,

    /// Conditions to splice into the WHERE clause.
    #[serde(default)]
    pub adhoc_filters: Vec<FilterCondition>,
}

impl QueryModel {
    /// Creates a log query with default settings.
    #[must_use]
    pub fn new(ref_id: impl Into<String>, raw_sql: impl Into<String>) -> Self {
        Self {
            ref_id: ref_id.into(),
            query_type: StreamType::default(),
            search_type: default_search_type(),
            use_cache: true,
            enable_sse: false,
            raw_sql: raw_sql.into(),
            from: 0,
            size: 0,
            adhoc_filters: Vec::new(),
        }
    }

    /// Adds an ad-hoc filter.
    #[must_use]
    pub fn with_filter(mut self, condition: FilterCondition) -> Self {
        self.adhoc_filters.push(condition);
        self
    }

    /// Sets the record kind.
    #[must_use]
    pub fn with_query_type(mut self, query_type: StreamType) -> Self {
        self.query_type = query_type;
        self
    }

    /// Selects the streaming protocol.
    #[must_use]
    pub fn with_streaming(mut self, enable_sse: bool) -> Self {
        self.enable_sse = enable_sse;
        self
    }

    /// Sets the requested number of hits.
    #[must_use]
    pub fn with_size(mut self, size: i64) -> Self {
        self.size = size;
        self
    }
}

/// The time window of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start of the window.
    pub from: DateTime<Utc>,
    /// End of the window.
    pub to: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a window.
    #[must_use]
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// The window ending now and spanning `span`.
    #[must_use]
    pub fn last(span: Duration) -> Self {
        let to = Utc::now();
        Self { from: to - span, to }
    }

    /// Start as Unix microseconds.
    #[must_use]
    pub fn start_micros(&self) -> i64 {
        self.from.timestamp_micros()
    }

    /// End as Unix microseconds.
    #[must_use]
    pub fn end_micros(&self) -> i64 {
        self.to.timestamp_micros()
    }
}

/// How a failed query should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// The query succeeded.
    Ok,
    /// The query itself is at fault.
    BadRequest,
    /// The backend or the result is at fault.
    Internal,
}

/// Errors that can fail a single query.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The query text could not be analyzed.
    #[error(transparent)]
    Analyze(#[from] ParseError),

    /// A malformed introspection command.
    #[error(transparent)]
    InvalidCommand(#[from] CommandError),

    /// The backend request failed.
    #[error(transparent)]
    Acquire(#[from] AcquireError),

    /// The results could not be shaped.
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

impl PipelineError {
    /// Returns the status class of this error.
    #[must_use]
    pub fn status_class(&self) -> ResultStatus {
        match self {
            Self::Analyze(_) | Self::InvalidCommand(_) => ResultStatus::BadRequest,
            Self::Acquire(_) | Self::Shape(_) => ResultStatus::Internal,
        }
    }
}

/// The outcome of one query of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Shaped results on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<ShapedFrame>,
    /// Error message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Outcome class.
    pub status: ResultStatus,
}

impl From<Result<ShapedFrame, PipelineError>> for QueryResult {
    fn from(result: Result<ShapedFrame, PipelineError>) -> Self {
        match result {
            Ok(frame) => Self {
                frame: Some(frame),
                error: None,
                status: ResultStatus::Ok,
            },
            Err(e) => Self {
                frame: None,
                status: e.status_class(),
                error: Some(e.to_string()),
            },
        }
    }
}

/// Returns the number of hits to request.
///
/// A positive LIMIT in the query wins; otherwise the requested size, or the
/// default when that is zero.
#[must_use]
pub fn effective_size(requested: i64, limit: u64) -> i64 {
    if limit > 0 {
        return i64::try_from(limit).unwrap_or(i64::MAX);
    }
    if requested > 0 {
        requested
    } else {
        DEFAULT_RESULT_SIZE
    }
}

/// Runs a single query against the backend.
///
/// Filter injection failures are logged and the original text is used
/// instead.
///
/// # Errors
///
/// Returns a `PipelineError` if analysis, acquisition or shaping fails.
pub async fn run_query(
    backend: &dyn SearchBackend,
    organization: &str,
    range: &TimeRange,
    model: &QueryModel,
) -> Result<ShapedFrame, PipelineError> {
    let sql = inject_filters(&model.raw_sql, &model.adhoc_filters).unwrap_or_else(|e| {
        tracing::warn!(
            ref_id = %model.ref_id,
            error = %e,
            "Filter injection failed, using the original query"
        );
        model.raw_sql.clone()
    });

    match analyze(&sql)? {
        Analysis::Introspection(command) => {
            let command = ListStreamsCommand::parse(&command)?;
            let streams = backend
                .list_streams(organization, command.stream_type)
                .await?;
            tracing::debug!(
                ref_id = %model.ref_id,
                stream_type = %command.stream_type,
                streams = streams.len(),
                "Listed streams"
            );
            Ok(ShapedFrame::Table(streams_frame(&streams)))
        }
        Analysis::Select(parsed) => {
            let params = SearchRequestParams {
                organization: organization.to_string(),
                stream_type: model.query_type,
                search_type: model.search_type.clone(),
                use_cache: model.use_cache,
            };
            let mut body = SearchRequestBody::new(SearchQuery {
                sql,
                start_time: range.start_micros(),
                end_time: range.end_micros(),
                from: model.from,
                size: effective_size(model.size, parsed.limit),
            });
            body.search_type.clone_from(&model.search_type);

            let envelope = backend.acquire(&params, &body, model.enable_sse).await?;
            let frame = shape(&parsed, &envelope)?;

            tracing::debug!(
                ref_id = %model.ref_id,
                hits = envelope.hits.len(),
                rows = frame.row_count(),
                "Query completed"
            );
            Ok(frame)
        }
    }
}

/// Runs every query of a batch, at most [`MAX_CONCURRENT_QUERIES`] at a time.
///
/// Results are keyed by `ref_id`.
pub async fn execute_batch(
    backend: &dyn SearchBackend,
    organization: &str,
    range: TimeRange,
    queries: Vec<QueryModel>,
) -> BTreeMap<String, QueryResult> {
    tracing::debug!(queries = queries.len(), %organization, "Executing query batch");

    stream::iter(queries)
        .map(|model| async move {
            let result = run_query(backend, organization, &range, &model).await;
            if let Err(e) = &result {
                tracing::warn!(ref_id = %model.ref_id, error = %e, "Query failed");
            }
            (model.ref_id, QueryResult::from(result))
        })
        .buffered(MAX_CONCURRENT_QUERIES)
        .collect::<BTreeMap<_, _>>()
        .await
}
