// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Capabilities the router depends on
//!
//! Each collaborator is an interchangeable implementation: remote
//! functions over HTTP, the in-process OCR pipeline, the local document
//! store, or test doubles.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::types::{CodeDecodeResult, DocumentId, DocumentRecord, RoutingError};

/// Reads the metadata of a stored document
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    async fn metadata(&self, id: &DocumentId) -> Result<HashMap<String, String>, RoutingError>;
}

/// Looks for a machine-readable code on the document
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CodeDecoder: Send + Sync {
    async fn decode(&self, id: &DocumentId) -> Result<CodeDecodeResult, RoutingError>;
}

/// Turns a decoded code payload into a structured result
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DecodeInterpreter: Send + Sync {
    async fn interpret(&self, decoded_text: &str) -> Result<Value, RoutingError>;
}

/// Extracts the printed text of a document; may return empty text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, id: &DocumentId) -> Result<String, RoutingError>;
}

/// Answers the fixed questions over extracted text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionAnswerer: Send + Sync {
    async fn answer(&self, text: &str) -> Result<Value, RoutingError>;
}

/// Stores the routing result of a document
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultPersister: Send + Sync {
    async fn persist(&self, id: &DocumentId, result: Value) -> Result<(), RoutingError>;
}

/// Handles documents that are not legal registrations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenericProcessor: Send + Sync {
    async fn process(&self, record: &DocumentRecord) -> Result<(), RoutingError>;
}

/// The full set of collaborators a router needs
#[derive(Clone)]
pub struct Collaborators {
    pub metadata: Arc<dyn MetadataLookup>,
    pub code_decoder: Arc<dyn CodeDecoder>,
    pub interpreter: Arc<dyn DecodeInterpreter>,
    pub text_extractor: Arc<dyn TextExtractor>,
    pub question_answerer: Arc<dyn QuestionAnswerer>,
    pub persister: Arc<dyn ResultPersister>,
    pub generic_processor: Arc<dyn GenericProcessor>,
}
