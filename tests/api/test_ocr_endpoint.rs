// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /ocr over scripted models

use crate::common::{fake_registry, png_base64};
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use docroute_node::api::{create_app, AppState};
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot`

fn app(text: &str) -> Router {
    create_app(AppState::new(fake_registry(text)))
}

async fn post(app: Router, uri: &str, body: impl Into<Body>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_ocr_success_shape() {
    let body = json!({"dataBase64": png_base64(200, 120)}).to_string();
    let (status, json) = post(app("Giấy chứng nhận"), "/ocr", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["text"], "Giấy chứng nhận");
    assert_eq!(json["regions_detected"], 1);
    let debug = &json["debug"];
    assert_eq!(debug["detection_method"], "preprocessed_adaptive_threshold");
    assert_eq!(debug["boxes_detected"], 0);
    assert_eq!(debug["regions_processed"], 1);
    assert_eq!(debug["final_text_length"], 15);
    assert_eq!(debug["lines"], json!(["Giấy chứng nhận"]));
    assert_eq!(debug["used_fallback"], true);
}

#[tokio::test]
async fn test_v1_alias_and_data_url() {
    let body = json!({"dataBase64": format!("data:image/png;base64,{}", png_base64(40, 40))}).to_string();
    let (status, json) = post(app("x"), "/v1/ocr", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["text"], "x");
}

#[tokio::test]
async fn test_blank_result_is_still_success() {
    let body = json!({"dataBase64": png_base64(40, 40)}).to_string();
    let (status, json) = post(app(""), "/ocr", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["text"], "");
    assert_eq!(json["regions_detected"], 0);
}

#[tokio::test]
async fn test_no_json_body() {
    let (status, json) = post(app("x"), "/ocr", "definitely not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, json!({"error": "No JSON data provided"}));

    let (status, json) = post(app("x"), "/ocr", "{}").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No JSON data provided");
}

#[tokio::test]
async fn test_missing_data_field() {
    let (status, json) = post(app("x"), "/ocr", r#"{"image": "abc"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, json!({"error": "dataBase64 field is required"}));
}

#[tokio::test]
async fn test_undecodable_image() {
    let (status, json) = post(app("x"), "/ocr", r#"{"dataBase64": "%%%not base64%%%"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid image data: "));

    // Valid base64, not an image
    let (status, _) = post(app("x"), "/ocr", r#"{"dataBase64": "aGVsbG8gd29ybGQ="}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_model_load_failure_is_internal_error() {
    let dir = tempfile::tempdir().unwrap();
    let registry = docroute_node::vision::OcrModelRegistry::from_config(
        docroute_node::vision::OcrModelConfig {
            model_dir: dir.path().to_path_buf(),
            ..Default::default()
        },
    );
    let app = create_app(AppState::new(std::sync::Arc::new(registry)));

    let body = json!({"dataBase64": png_base64(40, 40)}).to_string();
    let (status, json) = post(app, "/ocr", body).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], false);
    assert!(json["error"].is_string());
}
