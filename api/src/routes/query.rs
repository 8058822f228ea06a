//! Batch query endpoint.
//!
//! Accepts a batch of host queries and answers with one result slot per
//! `refId`. Per-query failures are reported in their slot; only malformed
//! batches are rejected as a whole.

use super::{api_error, ApiError, ErrorResponse, ValidationErrorDetail};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use shared::pipeline::{execute_batch, QueryModel, QueryResult, TimeRange};
use std::collections::{BTreeMap, HashSet};
use validator::Validate;

/// Window used when a batch does not carry one.
const DEFAULT_RANGE_HOURS: i64 = 1;

/// Request body for a query batch.
#[derive(Debug, Deserialize, Validate)]
pub struct QueryRequest {
    /// Organization to query (optional, defaults to the configured one).
    #[serde(default)]
    pub organization: Option<String>,

    /// Time window (optional, defaults to the last hour).
    #[serde(default)]
    pub range: Option<TimeRange>,

    /// The queries to run.
    #[validate(length(min = 1, message = "At least one query is required"))]
    pub queries: Vec<QueryModel>,
}

/// Response for a query batch.
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    /// Results keyed by `refId`.
    pub results: BTreeMap<String, QueryResult>,
}

/// Creates the query routes with application state.
pub fn query_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/query", post(run_batch))
        .with_state(state)
}

/// Handler for query batches.
async fn run_batch(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        api_error(
            StatusCode::BAD_REQUEST,
            "invalid_json",
            rejection.body_text(),
        )
    })?;

    validate_request(&request)?;

    let range = request
        .range
        .unwrap_or_else(|| TimeRange::last(Duration::hours(DEFAULT_RANGE_HOURS)));
    let organization = request
        .organization
        .unwrap_or_else(|| state.organization().to_string());

    let results = execute_batch(state.backend(), &organization, range, request.queries).await;

    tracing::debug!(
        %organization,
        results = results.len(),
        "Query batch completed"
    );

    Ok(Json(QueryResponse { results }))
}

fn validate_request(request: &QueryRequest) -> Result<(), ApiError> {
    if let Err(e) = request.validate() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "validation_failed",
            e.to_string(),
        ));
    }

    if let Some(range) = &request.range {
        if range.from > range.to {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "validation_failed",
                "Range start must not be after its end",
            ));
        }
    }

    let mut details = Vec::new();
    let mut seen = HashSet::new();
    for (index, query) in request.queries.iter().enumerate() {
        if let Err(errors) = query.validate() {
            for (field, field_errors) in errors.field_errors() {
                for error in field_errors {
                    details.push(ValidationErrorDetail {
                        index,
                        field: field.to_string(),
                        message: error
                            .message
                            .as_ref()
                            .map_or_else(|| error.code.to_string(), ToString::to_string),
                    });
                }
            }
        }
        if !seen.insert(query.ref_id.as_str()) {
            details.push(ValidationErrorDetail {
                index,
                field: "refId".to_string(),
                message: format!("Duplicate refId: {}", query.ref_id),
            });
        }
    }

    if details.is_empty() {
        return Ok(());
    }

    Err((
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "validation_failed".to_string(),
            message: format!("{} query/queries failed validation", details.len()),
            details: Some(details),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use shared::client::InMemoryBackend;
    use shared::models::{FieldValue, Hit, ResultEnvelope};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn create_test_router_with_backend() -> (Router, Arc<InMemoryBackend>) {
        let backend = InMemoryBackend::new_shared();
        let router = query_routes(AppState::new(backend.clone(), "default"));
        (router, backend)
    }

    async fn post(app: Router, body: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/query")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_query_batch_returns_slot_per_ref_id() {
        let (app, backend) = create_test_router_with_backend();
        backend.set_default_envelope(ResultEnvelope {
            hits: vec![Hit::from([(
                "level".to_string(),
                FieldValue::String("error".to_string()),
            )])],
            ..ResultEnvelope::default()
        });

        let (status, body) = post(
            app,
            r#"{"queries": [
                {"refId": "A", "rawSql": "SELECT level FROM logs"},
                {"refId": "B", "rawSql": "DROP TABLE logs"}
            ]}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"]["A"]["status"], "ok");
        assert_eq!(body["results"]["A"]["frame"]["mode"], "table");
        assert_eq!(body["results"]["B"]["status"], "bad_request");
        assert!(body["results"]["B"]["error"].is_string());
    }

    #[tokio::test]
    async fn test_query_uses_default_organization() {
        let (app, backend) = create_test_router_with_backend();

        let body = r#"{"queries": [{"refId": "A", "rawSql": "SELECT * FROM logs"}]}"#;
        let (status, _) = post(app, body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(backend.searches()[0].params.organization, "default");
    }

    #[tokio::test]
    async fn test_query_invalid_json() {
        let (app, _) = create_test_router_with_backend();
        let (status, body) = post(app, "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_json");
    }

    #[tokio::test]
    async fn test_query_empty_batch() {
        let (app, _) = create_test_router_with_backend();
        let (status, body) = post(app, r#"{"queries": []}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_failed");
    }

    #[tokio::test]
    async fn test_query_validation_details() {
        let (app, _) = create_test_router_with_backend();
        let (status, body) = post(
            app,
            r#"{"queries": [
                {"refId": "A", "rawSql": ""},
                {"refId": "A", "rawSql": "SELECT 1"}
            ]}"#,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_failed");
        let details = body["details"].as_array().unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(details[0]["index"], 0);
        assert!(details[0]["message"]
            .as_str()
            .is_some_and(|m| m.contains("SQL cannot be empty")));
        assert_eq!(details[1]["field"], "refId");
    }

    #[tokio::test]
    async fn test_query_rejects_inverted_range() {
        let (app, _) = create_test_router_with_backend();
        let (status, body) = post(
            app,
            r#"{
                "range": {"from": "2024-01-02T00:00:00Z", "to": "2024-01-01T00:00:00Z"},
                "queries": [{"refId": "A", "rawSql": "SELECT 1"}]
            }"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_failed");
    }
}
