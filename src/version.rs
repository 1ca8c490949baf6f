// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the DocRoute node

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-cpu-ocr-routing-2025-11-03";

/// Build date
pub const BUILD_DATE: &str = "2025-11-03";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "cpu-ocr",
    "lazy-model-init",
    "contrast-enhancement",
    "full-image-fallback",
    "legal-registration-routing",
    "code-fast-path",
    "batch-events",
    #[cfg(feature = "pdf")]
    "pdf-pages",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("DocRoute Node {} ({})", VERSION_NUMBER, BUILD_DATE)
}

/// Get full version info
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "build": VERSION,
        "date": BUILD_DATE,
        "features": FEATURES,
    })
}
