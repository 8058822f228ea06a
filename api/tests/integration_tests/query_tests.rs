//! Integration tests for the batch query endpoint.
//!
//! Tests cover:
//! - Log and table mode frames
//! - Ad-hoc filter injection reaching the backend
//! - LIMIT and size handling
//! - Per-query failures and introspection commands

use axum::http::StatusCode;
use serde_json::json;
use shared::models::{FieldValue, ResultEnvelope, StreamInfo, StreamType};

use super::common::{hit, post_json, test_app};

fn log_hit(timestamp: i64, msg: &str) -> shared::models::Hit {
    hit(&[
        ("_timestamp", FieldValue::Integer(timestamp)),
        ("msg", FieldValue::String(msg.into())),
    ])
}

fn range() -> serde_json::Value {
    json!({"from": "2024-01-01T00:00:00Z", "to": "2024-01-01T01:00:00Z"})
}

#[tokio::test]
async fn test_log_mode_rows_newest_first() {
    let (app, backend) = test_app();
    backend.set_default_envelope(ResultEnvelope {
        hits: vec![
            log_hit(100, "a"),
            log_hit(300, "b"),
            log_hit(200, "c"),
        ],
        ..ResultEnvelope::default()
    });

    let (status, response) = post_json(
        app,
        "/api/v1/query",
        json!({"range": range(), "queries": [{"refId": "A", "rawSql": "SELECT * FROM logs"}]}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let frame = &response["results"]["A"]["frame"];
    assert_eq!(frame["mode"], "log");
    let timestamps: Vec<i64> = frame["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["timestamp_us"].as_i64().unwrap())
        .collect();
    assert_eq!(timestamps, vec![300, 200, 100]);
}

#[tokio::test]
async fn test_table_mode_columns() {
    let (app, backend) = test_app();
    backend.set_default_envelope(ResultEnvelope {
        hits: vec![
            hit(&[("cnt", FieldValue::Integer(4)), ("level", FieldValue::String("error".into()))]),
            hit(&[("cnt", FieldValue::Integer(9)), ("level", FieldValue::String("info".into()))]),
        ],
        ..ResultEnvelope::default()
    });

    let (status, response) = post_json(
        app,
        "/api/v1/query",
        json!({
            "range": range(),
            "queries": [{
                "refId": "A",
                "rawSql": "SELECT level, count(*) AS cnt FROM logs GROUP BY level"
            }]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let fields = response["results"]["A"]["frame"]["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0]["name"], "level");
    assert_eq!(fields[0]["column"]["type"], "string");
    assert_eq!(fields[1]["name"], "cnt");
    assert_eq!(fields[1]["column"]["values"], json!([4, 9]));
}

#[tokio::test]
async fn test_filters_and_window_reach_backend() {
    let (app, backend) = test_app();

    let (status, _) = post_json(
        app,
        "/api/v1/query",
        json!({
            "organization": "acme",
            "range": range(),
            "queries": [{
                "refId": "A",
                "rawSql": "SELECT * FROM logs LIMIT 25",
                "queryType": "traces",
                "enableSse": true,
                "size": 1000,
                "adhocFilters": [
                    {"key": "level", "operator": "=", "value": "error"},
                    {"key": "code", "operator": ">", "value": "number(499)"}
                ]
            }]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let searches = backend.searches();
    assert_eq!(searches.len(), 1);
    let search = &searches[0];
    assert_eq!(search.params.organization, "acme");
    assert_eq!(search.params.stream_type, StreamType::Traces);
    assert!(search.streaming);
    assert_eq!(
        search.body.query.sql,
        "SELECT * FROM logs WHERE level = 'error' AND code > 499 LIMIT 25"
    );
    assert_eq!(search.body.query.size, 25);
    assert_eq!(search.body.query.start_time, 1_704_067_200_000_000);
    assert_eq!(search.body.query.end_time, 1_704_070_800_000_000);
}

#[tokio::test]
async fn test_failed_query_does_not_affect_siblings() {
    let (app, backend) = test_app();
    backend.fail_search("SELECT * FROM missing", 404);

    let (status, response) = post_json(
        app,
        "/api/v1/query",
        json!({
            "range": range(),
            "queries": [
                {"refId": "A", "rawSql": "SELECT * FROM logs"},
                {"refId": "B", "rawSql": "SELECT * FROM missing"},
                {"refId": "C", "rawSql": "SELECT FROM"}
            ]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let results = &response["results"];
    assert_eq!(results["A"]["status"], "ok");
    assert_eq!(results["B"]["status"], "internal");
    assert_eq!(
        results["B"]["error"],
        "http response status code: 404, body: search failed"
    );
    assert_eq!(results["C"]["status"], "bad_request");
    assert!(results["C"].get("frame").is_none());
}

#[tokio::test]
async fn test_introspection_command() {
    let (app, backend) = test_app();
    backend.set_streams(
        StreamType::Logs,
        ["web", "app"]
            .iter()
            .map(|name| StreamInfo {
                name: (*name).to_string(),
                ..StreamInfo::default()
            })
            .collect(),
    );

    let (status, response) = post_json(
        app,
        "/api/v1/query",
        json!({"queries": [{"refId": "A", "rawSql": "\\dt logs"}]}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let fields = response["results"]["A"]["frame"]["fields"].as_array().unwrap();
    assert_eq!(fields[0]["name"], "stream");
    assert_eq!(fields[0]["column"]["values"], json!(["app", "web"]));
    assert!(backend.searches().is_empty());
}

#[tokio::test]
async fn test_missing_queries_is_invalid_json() {
    let (app, _backend) = test_app();

    let (status, response) = post_json(app, "/api/v1/query", json!({"range": range()})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "invalid_json");
}
