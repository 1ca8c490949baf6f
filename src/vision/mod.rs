// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing for scanned documents
//!
//! This module provides:
//! - Image and document decoding into RGB pages
//! - Two-view OCR (detection + recognition) on CPU
//! - Lazily initialized, process-wide model instances

pub mod document;
pub mod image_utils;
pub mod model_manager;
pub mod ocr;

pub use document::{load_pages, MAX_DOCUMENT_PAGES};
pub use image_utils::{
    decode_base64_image, decode_image_bytes, detect_format, to_source_page, ImageError, ImageInfo,
    SourcePage,
};
pub use model_manager::{ModelLoader, ModelStatus, OcrModelConfig, OcrModelRegistry, OnnxModelLoader};
