// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Batch event endpoint

use axum::{body::Bytes, extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::errors::ApiError;
use super::http_server::AppState;
use crate::routing::{handle_event, BatchReport};

pub const COMPLETION_BODY: &str = "Processing completed";

/// Completion report for a batch of storage notifications
///
/// Always `statusCode: 200`; per-document failures are counted, not
/// surfaced as errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
    pub processed: usize,
    pub failed: usize,
}

impl From<&BatchReport> for EventResponse {
    fn from(report: &BatchReport) -> Self {
        Self {
            status_code: 200,
            body: COMPLETION_BODY.to_string(),
            processed: report.processed,
            failed: report.failed,
        }
    }
}

/// POST /events - Route every document named in a storage or queue event
pub async fn events_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<EventResponse>, ApiError> {
    let event: Value = serde_json::from_slice(&body)
        .map_err(|_| ApiError::InvalidRequest("No JSON data provided".to_string()))?;

    let router = state.router.as_ref().ok_or_else(|| {
        warn!("Event received but document routing is not configured");
        ApiError::ServiceUnavailable("Document routing not configured".to_string())
    })?;

    let report = handle_event(router, &event).await;
    info!(
        "Batch finished: {} processed, {} failed",
        report.processed, report.failed
    );

    Ok(Json(EventResponse::from(&report)))
}
