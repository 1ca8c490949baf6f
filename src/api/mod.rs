// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod events;
pub mod http_server;
pub mod ocr;

pub use errors::{ApiError, ErrorResponse};
pub use events::{events_handler, EventResponse};
pub use http_server::{create_app, start_server, AppState, HealthResponse, SERVICE_NAME};
pub use ocr::{ocr_handler, OcrDebugInfo, OcrRequest, OcrResponse};
