// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::events::events_handler;
use super::ocr::ocr_handler;
use crate::config::ServiceConfig;
use crate::routing::DocumentRouter;
use crate::vision::OcrModelRegistry;

pub const SERVICE_NAME: &str = "docroute-ocr";

/// Shared handler state
///
/// `router` is absent when the service only answers OCR requests.
#[derive(Clone)]
pub struct AppState {
    pub models: Arc<OcrModelRegistry>,
    pub router: Option<Arc<DocumentRouter>>,
}

impl AppState {
    pub fn new(models: Arc<OcrModelRegistry>) -> Self {
        Self {
            models,
            router: None,
        }
    }

    pub fn with_router(mut self, router: DocumentRouter) -> Self {
        self.router = Some(Arc::new(router));
        self
    }

    /// Models and router wired from configuration; nothing is loaded yet
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let models = Arc::new(OcrModelRegistry::from_config(config.ocr_model_config()));
        let router = config.document_router(models.clone())?;
        Ok(Self::new(models).with_router(router))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub detector_initialized: bool,
    pub predictor_initialized: bool,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ocr", post(ocr_handler))
        .route("/v1/ocr", post(ocr_handler))
        .route("/events", post(events_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn start_server(config: &ServiceConfig, state: AppState) -> Result<()> {
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("OCR service listening on {}", addr);

    let router = state.router.clone();
    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    if let Some(router) = router {
        router.drain().await;
    }

    Ok(())
}

/// GET /health - Reports whether the OCR models have been loaded
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.models.status();
    Json(HealthResponse {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
        detector_initialized: status.detector_initialized,
        predictor_initialized: status.predictor_initialized,
    })
}
