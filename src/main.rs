// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use docroute_node::{api::AppState, config::ServiceConfig, start_server, version};
use std::env;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    info!("Starting {}", version::get_version_string());

    let config = match env::var("DOCROUTE_CONFIG") {
        Ok(path) => ServiceConfig::from_toml_file(&path)?,
        Err(_) => ServiceConfig::from_env(),
    };
    config
        .validate()
        .map_err(|e| anyhow!("invalid configuration: {}", e))?;

    info!(
        "OCR models from {} ({} intra-op threads); documents under {}",
        config.ocr.model_dir.display(),
        config.ocr.intra_threads,
        config.document_root.display()
    );

    // Models load on the first request, not here
    let state = AppState::from_config(&config)?;
    start_server(&config, state).await
}
