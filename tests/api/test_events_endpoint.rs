// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /events

use crate::common::fake_registry;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use docroute_node::api::{create_app, AppState};
use docroute_node::config::ServiceConfig;
use serde_json::{json, Value};
use tower::util::ServiceExt;

async fn post_event(app: Router, body: String) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/events")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn app_with_router(root: &std::path::Path) -> Router {
    let mut config = ServiceConfig::default();
    config.document_root = root.to_path_buf();
    let models = fake_registry("text");
    let router = config.document_router(models.clone()).unwrap();
    create_app(AppState::new(models).with_router(router))
}

#[tokio::test]
async fn test_failures_still_report_completion() {
    let root = tempfile::tempdir().unwrap();
    let event = json!({
        "Records": [
            {"s3": {"bucket": {"name": "uploads"}, "object": {"key": "missing-1.pdf"}}},
            {"s3": {"bucket": {"name": "uploads"}, "object": {"key": "missing-2.pdf"}}}
        ]
    });

    let (status, json) = post_event(app_with_router(root.path()), event.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!({"statusCode": 200, "body": "Processing completed", "processed": 0, "failed": 2})
    );
}

#[tokio::test]
async fn test_empty_event() {
    let root = tempfile::tempdir().unwrap();
    let (status, json) = post_event(app_with_router(root.path()), json!({}).to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["processed"], 0);
    assert_eq!(json["failed"], 0);
}

#[tokio::test]
async fn test_invalid_event_body() {
    let root = tempfile::tempdir().unwrap();
    let (status, json) = post_event(app_with_router(root.path()), "{".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No JSON data provided");
}

#[tokio::test]
async fn test_events_without_router() {
    let app = create_app(AppState::new(fake_registry("text")));
    let (status, json) = post_event(app, json!({"Records": []}).to_string()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["success"], false);
}
