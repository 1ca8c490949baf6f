// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-process text extraction over the OCR pipeline

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::collaborators::TextExtractor;
use super::types::{DocumentId, RoutingError};
use crate::storage::DocumentStore;
use crate::vision::{load_pages, OcrModelRegistry};

/// Extracts text from the first pages of a stored document
///
/// Models come from the shared registry, so the first document pays
/// for their initialization.
#[derive(Clone)]
pub struct PipelineTextExtractor {
    store: Arc<dyn DocumentStore>,
    models: Arc<OcrModelRegistry>,
}

impl PipelineTextExtractor {
    pub fn new(store: Arc<dyn DocumentStore>, models: Arc<OcrModelRegistry>) -> Self {
        Self { store, models }
    }
}

#[async_trait]
impl TextExtractor for PipelineTextExtractor {
    async fn extract(&self, id: &DocumentId) -> Result<String, RoutingError> {
        let bytes = self.store.fetch(id).await?;
        let pipeline = self
            .models
            .pipeline()
            .await
            .map_err(|e| RoutingError::collaborator(format!("OCR models unavailable: {:#}", e)))?;

        let name = id.path.clone();
        let result = tokio::task::spawn_blocking(move || {
            let pages = load_pages(&bytes, &name)
                .map_err(|e| RoutingError::invalid_input(e.to_string()))?;
            Ok::<_, RoutingError>(pipeline.process_pages(&pages))
        })
        .await
        .map_err(|e| RoutingError::collaborator(format!("OCR task failed: {}", e)))??;

        info!(
            "{}: extracted {} line(s), {} chars",
            id,
            result.lines.len(),
            result.text.len()
        );
        Ok(result.text)
    }
}
