// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR request types and validation

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::errors::ApiError;

/// Request for OCR processing: `{"dataBase64": "<image>"}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrRequest {
    /// Base64-encoded image data, optionally as a data URL
    #[serde(rename = "dataBase64", default)]
    pub data_base64: Option<String>,
}

impl OcrRequest {
    /// Parse a raw request body
    ///
    /// An unparseable or empty JSON body is rejected before field checks.
    pub fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|_| ApiError::InvalidRequest("No JSON data provided".to_string()))?;

        let is_empty = match &value {
            Value::Object(map) => map.is_empty(),
            Value::Null => true,
            _ => false,
        };
        if is_empty {
            return Err(ApiError::InvalidRequest("No JSON data provided".to_string()));
        }

        // Non-object bodies and non-string fields read as a missing field
        Ok(serde_json::from_value(value).unwrap_or_default())
    }

    /// The base64 payload, which must be present and non-empty
    pub fn image_data(&self) -> Result<&str, ApiError> {
        self.data_base64
            .as_deref()
            .filter(|data| !data.trim().is_empty())
            .ok_or_else(|| ApiError::InvalidRequest("dataBase64 field is required".to_string()))
    }
}
