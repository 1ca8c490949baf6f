// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::ServiceConfig;
use crate::routing::{handle_event, DocumentId};
use crate::vision::{load_pages, OcrModelRegistry};

/// DocRoute CLI
#[derive(Parser, Debug)]
#[command(name = "docroute-cli")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "OCR and document routing tools", long_about = None)]
pub struct Cli {
    /// TOML configuration file (defaults to environment variables)
    #[arg(long, global = true, env = "DOCROUTE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract text from an image or PDF
    Ocr(OcrArgs),

    /// Route one stored document
    Route(RouteArgs),

    /// Run the batch handler over a storage or queue event file
    Batch(BatchArgs),
}

#[derive(Args, Debug)]
pub struct OcrArgs {
    /// Image or PDF file
    pub file: PathBuf,

    /// Print the full result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RouteArgs {
    /// Container (bucket) name
    #[arg(long)]
    pub container: String,

    /// Object path within the container
    #[arg(long)]
    pub path: String,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Event JSON file
    pub event: PathBuf,
}

impl Cli {
    pub fn load_config(&self) -> Result<ServiceConfig> {
        let config = match &self.config {
            Some(path) => ServiceConfig::from_toml_file(path)?,
            None => ServiceConfig::from_env(),
        };
        config
            .validate()
            .map_err(|e| anyhow!("invalid configuration: {}", e))?;
        Ok(config)
    }
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let config = cli.load_config()?;
    let models = Arc::new(OcrModelRegistry::from_config(config.ocr_model_config()));

    match cli.command {
        Commands::Ocr(args) => run_ocr(args, models).await,
        Commands::Route(args) => {
            let router = config.document_router(models)?;
            let id = DocumentId::new(args.container, args.path);
            info!("Routing {}", id);
            let outcome = router.route(id).await;
            router.drain().await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if outcome.is_failed() {
                return Err(anyhow!("routing failed"));
            }
            Ok(())
        }
        Commands::Batch(args) => {
            let router = config.document_router(models)?;
            let contents = tokio::fs::read_to_string(&args.event)
                .await
                .with_context(|| format!("failed to read {}", args.event.display()))?;
            let event: serde_json::Value =
                serde_json::from_str(&contents).context("event file is not valid JSON")?;
            let report = handle_event(&router, &event).await;
            router.drain().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

async fn run_ocr(args: OcrArgs, models: Arc<OcrModelRegistry>) -> Result<()> {
    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let name = args.file.to_string_lossy().into_owned();

    let pipeline = models.pipeline().await?;
    let result = tokio::task::spawn_blocking(move || -> Result<_> {
        let pages = load_pages(&bytes, &name)?;
        Ok(pipeline.process_pages(&pages))
    })
    .await??;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.text);
    }
    Ok(())
}
