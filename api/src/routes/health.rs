//! Health check endpoints.
//!
//! `/health` reports that the bridge itself is up; `/api/v1/health/backend`
//! checks that OpenObserve answers.

use super::{api_error, ApiError};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status (always "healthy" if reachable).
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Service version.
    pub version: &'static str,
}

/// Backend health check response.
#[derive(Debug, Serialize)]
pub struct BackendHealthResponse {
    /// Backend status.
    pub status: &'static str,
    /// Organization the bridge queries by default.
    pub organization: String,
}

/// Creates the health check routes.
pub fn health_routes() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Creates the backend health route.
pub fn backend_health_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health/backend", get(backend_health))
        .with_state(state)
}

/// Health check handler.
///
/// Returns a simple JSON response indicating the service is healthy.
/// This endpoint is intended for use by load balancers and monitoring systems.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "o2bridge-api",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Backend health handler. Answers 502 when the backend is unreachable.
async fn backend_health(
    State(state): State<AppState>,
) -> Result<Json<BackendHealthResponse>, ApiError> {
    state.backend().health_check().await.map_err(|e| {
        tracing::warn!(error = %e, "Backend health check failed");
        api_error(StatusCode::BAD_GATEWAY, "backend_error", e.to_string())
    })?;

    Ok(Json(BackendHealthResponse {
        status: "healthy",
        organization: state.organization().to_string(),
    }))
}
