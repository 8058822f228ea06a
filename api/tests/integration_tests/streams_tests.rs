//! Integration tests for the stream listing endpoint.

use axum::http::StatusCode;
use serde_json::json;
use shared::models::{SchemaField, StreamInfo, StreamType};

use super::common::{get, test_app};

fn stream(name: &str, fields: &[&str]) -> StreamInfo {
    StreamInfo {
        name: name.to_string(),
        stream_type: "metrics".to_string(),
        schema: fields
            .iter()
            .map(|field| SchemaField {
                name: (*field).to_string(),
                field_type: "Utf8".to_string(),
            })
            .collect(),
        ..StreamInfo::default()
    }
}

#[tokio::test]
async fn test_list_metric_streams() {
    let (app, backend) = test_app();
    backend.set_streams(
        StreamType::Metrics,
        vec![
            stream("cpu", &["_timestamp", "host", "value"]),
            stream("mem", &["_timestamp", "value"]),
        ],
    );

    let (status, response) = get(app, "/api/v1/streams?type=metrics&organization=acme").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        response["streams"],
        json!({
            "cpu": ["_timestamp", "host", "value"],
            "mem": ["_timestamp", "value"]
        })
    );
}

#[tokio::test]
async fn test_kinds_are_listed_separately() {
    let (app, backend) = test_app();
    backend.set_streams(StreamType::Metrics, vec![stream("cpu", &["value"])]);

    let (status, response) = get(app, "/api/v1/streams?type=logs").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["streams"], json!({}));
}

#[tokio::test]
async fn test_unknown_kind_rejected() {
    let (app, _backend) = test_app();

    let (status, response) = get(app, "/api/v1/streams?type=profiles").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "invalid_query");
}
