// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Two-view detect-then-recognize OCR
//!
//! Components:
//! - `preprocessing` - Detection/recognition views, contrast, tensors
//! - `detection` - Text region detection (DB post-processing)
//! - `geometry` - Detection-space polygons to recognition-space boxes
//! - `extraction` - Crop and upscale recognition patches
//! - `recognition` - CTC text recognition per patch
//! - `aggregation` - Line ordering, joining and whole-image fallback
//! - `pipeline` - The combined per-page pipeline

pub mod aggregation;
pub mod detection;
pub mod extraction;
pub mod geometry;
pub mod pipeline;
pub mod preprocessing;
pub mod recognition;

use thiserror::Error;

pub use aggregation::{aggregate_lines, aggregate_with_fallback, AggregatedText};
pub use detection::{DetectionParams, OcrDetectionModel, TextDetector};
pub use extraction::{extract_patch, MIN_PATCH_HEIGHT};
pub use geometry::{map_polygons, Polygon, ScaledRegion, ViewSize, REGION_PAD};
pub use pipeline::{OcrPipeline, OcrResult};
pub use preprocessing::{normalize, ViewMode};
pub use recognition::{OcrRecognitionModel, TextRecognizer};

/// Errors raised by the OCR layer
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("OCR model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),
}
