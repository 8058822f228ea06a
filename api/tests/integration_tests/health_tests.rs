//! Integration tests for the health endpoints.
//!
//! Tests cover:
//! - Service health check
//! - Backend health check, reachable and unreachable

use axum::http::StatusCode;

use super::common::{get, test_app};

#[tokio::test]
async fn test_health_check() {
    let (app, _backend) = test_app();

    let (status, response) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "healthy");
    assert_eq!(response["service"], "o2bridge-api");
}

#[tokio::test]
async fn test_backend_health_reachable() {
    let (app, _backend) = test_app();

    let (status, response) = get(app, "/api/v1/health/backend").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "healthy");
    assert_eq!(response["organization"], "default");
}

#[tokio::test]
async fn test_backend_health_unreachable() {
    let (app, backend) = test_app();
    backend.set_healthy(false);

    let (status, response) = get(app, "/api/v1/health/backend").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(response["error"], "backend_error");
    assert!(response["message"]
        .as_str()
        .is_some_and(|m| m.contains("503")));
}
