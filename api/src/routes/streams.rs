//! Stream listing endpoint.
//!
//! Lists the streams of one kind together with their field names.

use super::{api_error, ApiError};
use crate::state::AppState;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use shared::models::StreamType;
use std::collections::BTreeMap;

/// Query parameters for stream listing.
#[derive(Debug, Deserialize)]
pub struct StreamsParams {
    /// Organization (optional, defaults to the configured one).
    pub organization: Option<String>,
    /// Kind of streams to list (default: logs).
    #[serde(default, rename = "type")]
    pub stream_type: StreamType,
}

/// Response for stream listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct StreamsResponse {
    /// Field names per stream, keyed by stream name.
    pub streams: BTreeMap<String, Vec<String>>,
}

/// Creates the stream listing routes with application state.
pub fn streams_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/streams", get(list_streams))
        .with_state(state)
}

async fn list_streams(
    State(state): State<AppState>,
    params: Result<Query<StreamsParams>, QueryRejection>,
) -> Result<Json<StreamsResponse>, ApiError> {
    let Query(params) = params.map_err(|rejection| {
        api_error(
            StatusCode::BAD_REQUEST,
            "invalid_query",
            rejection.body_text(),
        )
    })?;

    let organization = params
        .organization
        .unwrap_or_else(|| state.organization().to_string());

    let streams = state
        .backend()
        .list_streams(&organization, params.stream_type)
        .await
        .map_err(|e| {
            tracing::error!(%organization, error = %e, "Failed to list streams");
            api_error(StatusCode::BAD_GATEWAY, "backend_error", e.to_string())
        })?;

    tracing::debug!(
        %organization,
        stream_type = %params.stream_type,
        count = streams.len(),
        "Listed streams"
    );

    Ok(Json(StreamsResponse {
        streams: streams
            .iter()
            .map(|stream| (stream.name.clone(), stream.field_names()))
            .collect(),
    }))
}
