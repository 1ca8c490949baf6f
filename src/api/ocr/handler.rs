// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR endpoint handler

use axum::{body::Bytes, extract::State, Json};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::request::OcrRequest;
use super::response::OcrResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::vision::{decode_base64_image, to_source_page};

/// POST /ocr - Extract text from a base64-encoded image
///
/// The body is read raw so malformed JSON gets the same error shape as
/// every other client error.
///
/// # Errors
/// - 400: no JSON body, missing `dataBase64`, undecodable image
/// - 500: models failed to load or the pipeline task panicked
pub async fn ocr_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<OcrResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let request = OcrRequest::from_body(&body).map_err(|e| {
        warn!("[{}] OCR request rejected: {}", request_id, e);
        e
    })?;
    let data = request.image_data()?;

    let (image, info) = decode_base64_image(data).map_err(|e| {
        warn!("[{}] OCR image decode failed: {}", request_id, e);
        ApiError::InvalidRequest(format!("Invalid image data: {}", e))
    })?;
    debug!(
        "[{}] OCR input {}x{} {:?} ({} bytes)",
        request_id, info.width, info.height, info.format, info.size_bytes
    );

    let pipeline = state.models.pipeline().await.map_err(|e| {
        error!("[{}] OCR models unavailable: {:#}", request_id, e);
        ApiError::InternalError(format!("{:#}", e))
    })?;

    let page = to_source_page(image);
    let result = tokio::task::spawn_blocking(move || pipeline.process(&page))
        .await
        .map_err(|e| {
            error!("[{}] OCR task failed: {}", request_id, e);
            ApiError::InternalError(format!("OCR task failed: {}", e))
        })?;

    info!(
        "[{}] OCR complete: {} line(s) from {} box(es) in {}ms{}",
        request_id,
        result.lines.len(),
        result.boxes_detected,
        result.processing_time_ms,
        if result.used_fallback { " (full-image fallback)" } else { "" }
    );

    Ok(Json(OcrResponse::from(result)))
}
