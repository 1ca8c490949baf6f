// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR response types

use serde::{Deserialize, Serialize};

use crate::vision::ocr::pipeline::{OcrResult, DETECTION_METHOD};

/// Pipeline diagnostics returned with every OCR response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OcrDebugInfo {
    pub detection_method: String,
    pub boxes_detected: usize,
    /// Number of recognized lines
    pub regions_processed: usize,
    /// Length of `text` in characters
    pub final_text_length: usize,
    pub lines: Vec<String>,
    pub used_fallback: bool,
}

/// Response from OCR processing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OcrResponse {
    /// Recognized lines joined with newlines
    pub text: String,
    pub success: bool,
    /// Number of recognized lines
    pub regions_detected: usize,
    pub debug: OcrDebugInfo,
}

impl From<OcrResult> for OcrResponse {
    fn from(result: OcrResult) -> Self {
        let line_count = result.lines.len();
        Self {
            debug: OcrDebugInfo {
                detection_method: DETECTION_METHOD.to_string(),
                boxes_detected: result.boxes_detected,
                regions_processed: line_count,
                final_text_length: result.text.chars().count(),
                lines: result.lines,
                used_fallback: result.used_fallback,
            },
            text: result.text,
            success: true,
            regions_detected: line_count,
        }
    }
}
