// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Document storage
//!
//! The router and the OCR extractor only need two things from storage:
//! the raw bytes of a document and its metadata map.

pub mod local;

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

use crate::routing::{DocumentId, RoutingError};

pub use local::LocalDocumentStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for RoutingError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidPath(_) => RoutingError::invalid_input(err.to_string()),
            other => RoutingError::collaborator(other.to_string()),
        }
    }
}

/// Read access to stored documents
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Raw document bytes
    async fn fetch(&self, id: &DocumentId) -> Result<Vec<u8>, StorageError>;

    /// Metadata with lowercased keys; empty when none was stored
    async fn metadata(&self, id: &DocumentId) -> Result<HashMap<String, String>, StorageError>;
}
