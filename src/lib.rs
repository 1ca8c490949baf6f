// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod routing;
pub mod storage;
pub mod version;
pub mod vision;

pub use api::{create_app, start_server, AppState};
pub use config::ServiceConfig;
pub use routing::{DocumentId, DocumentRouter, RoutingOutcome};
pub use vision::ocr::{OcrPipeline, OcrResult};
pub use vision::OcrModelRegistry;
