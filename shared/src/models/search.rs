//! Search request and response models.
//!
//! These mirror the JSON accepted and returned by the OpenObserve
//! `_search` and `_search_stream` endpoints.

use super::value::FieldValue;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default `search_type` query parameter.
pub const DEFAULT_SEARCH_TYPE: &str = "ui";

/// Default number of hits requested when the caller gives none.
pub const DEFAULT_RESULT_SIZE: i64 = 200;

/// Server-side search timeout, in seconds, sent in every request body.
pub const SEARCH_TIMEOUT_SECS: u64 = 60;

/// A single backend record, keyed by field name.
pub type Hit = BTreeMap<String, FieldValue>;

/// The record kind of an OpenObserve stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    /// Log records.
    #[default]
    Logs,
    /// Metric samples.
    Metrics,
    /// Trace spans.
    Traces,
}

impl StreamType {
    /// The name used in query parameters.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Logs => "logs",
            Self::Metrics => "metrics",
            Self::Traces => "traces",
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known stream type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid stream type: {0}, expected one of: logs, metrics, traces")]
pub struct InvalidStreamTypeError(pub String);

impl FromStr for StreamType {
    type Err = InvalidStreamTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "logs" => Ok(Self::Logs),
            "metrics" => Ok(Self::Metrics),
            "traces" => Ok(Self::Traces),
            other => Err(InvalidStreamTypeError(other.to_string())),
        }
    }
}

/// Query-string parameters of a search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequestParams {
    /// Organization the stream belongs to.
    pub organization: String,
    /// Record kind, sent as `type`.
    pub stream_type: StreamType,
    /// Sent as `search_type`.
    pub search_type: String,
    /// Sent as `use_cache`.
    pub use_cache: bool,
}

impl SearchRequestParams {
    /// Creates parameters with the default search type and caching enabled.
    #[must_use]
    pub fn new(organization: impl Into<String>, stream_type: StreamType) -> Self {
        Self {
            organization: organization.into(),
            stream_type,
            search_type: DEFAULT_SEARCH_TYPE.to_string(),
            use_cache: true,
        }
    }
}

/// The `query` object of a search request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Final SQL text.
    pub sql: String,
    /// Range start, Unix microseconds.
    pub start_time: i64,
    /// Range end, Unix microseconds.
    pub end_time: i64,
    /// Offset of the first hit.
    pub from: i64,
    /// Maximum number of hits.
    pub size: i64,
}

/// JSON body of a search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequestBody {
    /// The query and its window.
    pub query: SearchQuery,
    /// Repeats the `search_type` parameter.
    pub search_type: String,
    /// Server-side timeout in seconds.
    pub timeout: u64,
}

impl SearchRequestBody {
    /// Wraps a query with the default search type and timeout.
    #[must_use]
    pub fn new(query: SearchQuery) -> Self {
        Self {
            query,
            search_type: DEFAULT_SEARCH_TYPE.to_string(),
            timeout: SEARCH_TIMEOUT_SECS,
        }
    }
}

/// Timing breakdown reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TookDetail {
    /// Total time, ms.
    #[serde(deserialize_with = "null_as_default")]
    pub total: i64,
    /// Time spent in the result cache, ms.
    #[serde(deserialize_with = "null_as_default")]
    pub cache_took: i64,
    /// Time spent listing files, ms.
    #[serde(deserialize_with = "null_as_default")]
    pub file_list_took: i64,
    /// Time spent queued, ms.
    #[serde(deserialize_with = "null_as_default")]
    pub wait_in_queue: i64,
    /// Time spent in indexes, ms.
    #[serde(deserialize_with = "null_as_default")]
    pub idx_took: i64,
    /// Time spent searching, ms.
    #[serde(deserialize_with = "null_as_default")]
    pub search_took: i64,
}

/// The normalized result of one search request, regardless of wire protocol.
///
/// Every field defaults when absent; unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultEnvelope {
    /// Backend-returned records.
    #[serde(deserialize_with = "null_as_default")]
    pub hits: Vec<Hit>,
    /// Total number of matching records.
    #[serde(deserialize_with = "null_as_default")]
    pub total: i64,
    /// Query time, ms.
    #[serde(deserialize_with = "null_as_default")]
    pub took: i64,
    /// Timing breakdown.
    #[serde(deserialize_with = "null_as_default")]
    pub took_detail: TookDetail,
    /// Whether the result is incomplete.
    #[serde(deserialize_with = "null_as_default")]
    pub is_partial: bool,
    /// Offset of the first hit.
    #[serde(deserialize_with = "null_as_default")]
    pub from: i64,
    /// Page size.
    #[serde(deserialize_with = "null_as_default")]
    pub size: i64,
    /// Percentage of data served from cache.
    #[serde(deserialize_with = "null_as_default")]
    pub cached_ratio: i64,
    /// Bytes scanned.
    #[serde(deserialize_with = "null_as_default")]
    pub scan_size: i64,
    /// Index bytes scanned.
    #[serde(deserialize_with = "null_as_default")]
    pub idx_scan_size: i64,
    /// Records scanned.
    #[serde(deserialize_with = "null_as_default")]
    pub scan_records: i64,
    /// Backend trace identifier.
    #[serde(deserialize_with = "null_as_default")]
    pub trace_id: String,
    /// Percentage of the result served from the result cache.
    #[serde(deserialize_with = "null_as_default")]
    pub result_cache_ratio: i64,
    /// Work group that served the query.
    #[serde(deserialize_with = "null_as_default")]
    pub work_group: String,
    /// Effective ordering reported by the backend.
    #[serde(deserialize_with = "null_as_default")]
    pub order_by: String,
}

/// Decodes JSON `null` as the type's default, as absent fields already are.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stream_type_parse() {
        assert_eq!("logs".parse::<StreamType>(), Ok(StreamType::Logs));
        assert_eq!("traces".parse::<StreamType>(), Ok(StreamType::Traces));
        assert!("tables".parse::<StreamType>().is_err());
        assert_eq!(StreamType::Metrics.to_string(), "metrics");
    }

    #[test]
    fn test_request_body_shape() {
        let body = SearchRequestBody::new(SearchQuery {
            sql: "SELECT * FROM logs".to_string(),
            start_time: 1,
            end_time: 2,
            from: 0,
            size: 200,
        });

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "query": {
                    "sql": "SELECT * FROM logs",
                    "start_time": 1,
                    "end_time": 2,
                    "from": 0,
                    "size": 200
                },
                "search_type": "ui",
                "timeout": 60
            })
        );
    }

    #[test]
    fn test_envelope_tolerates_missing_and_unknown_fields() {
        let envelope: ResultEnvelope = serde_json::from_value(json!({
            "hits": [{"level": "error", "code": 500}],
            "took": 12,
            "trace_id": null,
            "new_backend_field": {"x": 1}
        }))
        .unwrap();

        assert_eq!(envelope.hits.len(), 1);
        assert_eq!(envelope.took, 12);
        assert_eq!(envelope.total, 0);
        assert!(!envelope.is_partial);
        assert_eq!(envelope.hits[0]["code"], FieldValue::Integer(500));
    }
}
