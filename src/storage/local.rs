// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Filesystem-backed document store
//!
//! Layout: `<root>/<container>/<path>` holds the document and
//! `<root>/<container>/<path>.metadata.json` an optional flat JSON
//! object of string metadata.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use super::{DocumentStore, StorageError};
use crate::routing::{DocumentId, MetadataLookup, RoutingError};

const METADATA_SUFFIX: &str = ".metadata.json";

#[derive(Debug, Clone)]
pub struct LocalDocumentStore {
    root: PathBuf,
}

impl LocalDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of a document; rejects anything escaping the root
    pub fn document_path(&self, id: &DocumentId) -> Result<PathBuf, StorageError> {
        let container = validate_relative(&id.container)?;
        let path = validate_relative(&id.path)?;
        Ok(self.root.join(container).join(path))
    }

    fn metadata_path(&self, id: &DocumentId) -> Result<PathBuf, StorageError> {
        let mut path = self.document_path(id)?.into_os_string();
        path.push(METADATA_SUFFIX);
        Ok(PathBuf::from(path))
    }

    /// Store a document and its metadata (used by tooling and tests)
    pub async fn put(
        &self,
        id: &DocumentId,
        data: &[u8],
        metadata: &HashMap<String, String>,
    ) -> Result<(), StorageError> {
        let path = self.document_path(id)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;

        if !metadata.is_empty() {
            let json = serde_json::to_vec(metadata)
                .map_err(|e| StorageError::InvalidMetadata(e.to_string()))?;
            tokio::fs::write(self.metadata_path(id)?, json).await?;
        }
        Ok(())
    }
}

fn validate_relative(part: &str) -> Result<&Path, StorageError> {
    if part.is_empty() {
        return Err(StorageError::InvalidPath("Empty path".to_string()));
    }

    let path = Path::new(part);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(StorageError::InvalidPath(format!(
            "Path traversal not allowed: {}",
            part
        )));
    }
    Ok(path)
}

fn not_found_or(err: std::io::Error, what: &Path) -> StorageError {
    if err.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound(what.display().to_string())
    } else {
        StorageError::Io(err)
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn fetch(&self, id: &DocumentId) -> Result<Vec<u8>, StorageError> {
        let path = self.document_path(id)?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| not_found_or(e, &path))?;
        debug!("Fetched {} ({} bytes)", id, bytes.len());
        Ok(bytes)
    }

    async fn metadata(&self, id: &DocumentId) -> Result<HashMap<String, String>, StorageError> {
        let document = self.document_path(id)?;
        if !tokio::fs::try_exists(&document).await? {
            return Err(StorageError::NotFound(document.display().to_string()));
        }

        let path = self.metadata_path(id)?;
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(StorageError::Io(e)),
        };

        let parsed: HashMap<String, String> = serde_json::from_slice(&raw)
            .map_err(|e| StorageError::InvalidMetadata(format!("{}: {}", path.display(), e)))?;

        Ok(parsed
            .into_iter()
            .map(|(key, value)| (key.to_lowercase(), value))
            .collect())
    }
}

#[async_trait]
impl MetadataLookup for LocalDocumentStore {
    async fn metadata(&self, id: &DocumentId) -> Result<HashMap<String, String>, RoutingError> {
        Ok(DocumentStore::metadata(self, id).await?)
    }
}
