// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! In-process stand-ins for the remote collaborator functions

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Clone, Default)]
pub struct Calls {
    inner: Arc<Mutex<Vec<(String, Value)>>>,
}

impl Calls {
    fn record(&self, function: &str, payload: &Value) {
        self.inner
            .lock()
            .unwrap()
            .push((function.to_string(), payload.clone()));
    }

    pub fn of(&self, function: &str) -> Vec<Value> {
        self.inner
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == function)
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

/// Keys containing `qr` carry a code; keys containing `broken` fail
async fn decode(State(calls): State<Calls>, Json(payload): Json<Value>) -> (StatusCode, Json<Value>) {
    calls.record("decode", &payload);
    let key = payload["key"].as_str().unwrap_or_default();
    if key.contains("broken") {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "decoder crashed"})),
        );
    }
    let body = if key.contains("qr") {
        json!({"hasQR": true, "decodedText": "001099012345|Nguyen Van A", "box": {"points": [{"x": 1.0, "y": 2.0}]}})
    } else {
        json!({"hasQR": false})
    };
    (
        StatusCode::OK,
        Json(json!({"statusCode": 200, "body": body.to_string()})),
    )
}

async fn interpret(State(calls): State<Calls>, Json(payload): Json<Value>) -> Json<Value> {
    calls.record("interpret", &payload);
    Json(json!({"idNumber": "001099012345", "source": payload["decodedText"]}))
}

async fn answer(State(calls): State<Calls>, Json(payload): Json<Value>) -> Json<Value> {
    calls.record("qa", &payload);
    Json(json!({"statusCode": 200, "body": json!({"answers": [payload["text"]]}).to_string()}))
}

async fn save(State(calls): State<Calls>, Json(payload): Json<Value>) -> Json<Value> {
    calls.record("save", &payload);
    Json(json!({"statusCode": 200, "body": "\"saved\""}))
}

async fn generic(State(calls): State<Calls>, Json(payload): Json<Value>) -> Json<Value> {
    calls.record("generic", &payload);
    Json(json!({}))
}

async fn failing(State(calls): State<Calls>, Json(payload): Json<Value>) -> Json<Value> {
    calls.record("failing", &payload);
    Json(json!({"statusCode": 502, "body": "{\"error\": \"upstream\"}"}))
}

async fn slow(Json(_payload): Json<Value>) -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({}))
}

async fn not_json(Json(_payload): Json<Value>) -> &'static str {
    "<html>oops</html>"
}

pub struct FakeFunctions {
    pub base_url: String,
    pub calls: Calls,
}

impl FakeFunctions {
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

pub async fn spawn() -> FakeFunctions {
    let calls = Calls::default();
    let app = Router::new()
        .route("/decode", post(decode))
        .route("/interpret", post(interpret))
        .route("/qa", post(answer))
        .route("/save", post(save))
        .route("/generic", post(generic))
        .route("/failing", post(failing))
        .route("/slow", post(slow))
        .route("/not-json", post(not_json))
        .with_state(calls.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeFunctions {
        base_url: format!("http://{}", addr),
        calls,
    }
}
