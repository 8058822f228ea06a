//! API route definitions.
//!
//! This module organizes all HTTP routes for the o2bridge API server.

mod health;
mod query;
mod streams;

pub use health::{backend_health_routes, health_routes};
pub use query::query_routes;
pub use streams::streams_routes;

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

/// Error body shared by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error type.
    pub error: String,
    /// Detailed error message.
    pub message: String,
    /// Per-item validation errors (for batch requests).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

/// Validation error detail for one item of a batch.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Index in the batch.
    pub index: usize,
    /// Field that failed validation.
    pub field: String,
    /// Error message.
    pub message: String,
}

/// A rejected request: status plus JSON error body.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, error: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            message: message.into(),
            details: None,
        }),
    )
}
