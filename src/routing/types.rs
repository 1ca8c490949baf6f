// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Document routing data model

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Metadata key holding the declared document type
pub const DOCUMENT_TYPE_KEY: &str = "document-type";

/// Document type that enables the code-first routing
pub const LEGAL_REGISTRATION: &str = "legal registration";

/// A stored document, addressed by container and path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId {
    pub container: String,
    pub path: String,
}

impl DocumentId {
    pub fn new(container: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.path)
    }
}

/// A document plus its declared type; read-only for the router
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub document_type: Option<String>,
}

impl DocumentRecord {
    pub fn new(id: DocumentId, document_type: Option<String>) -> Self {
        Self { id, document_type }
    }

    /// Case-insensitive exact match against [`LEGAL_REGISTRATION`]
    pub fn is_legal_registration(&self) -> bool {
        self.document_type
            .as_deref()
            .is_some_and(|t| t.to_lowercase() == LEGAL_REGISTRATION)
    }
}

/// Failure categories surfaced by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input or missing fields; not retryable
    InvalidInput,
    /// Detector failed; recovered inside the OCR pipeline
    DetectionFailure,
    /// The slow path produced no text
    ExtractionEmpty,
    /// A synchronous collaborator call failed
    CollaboratorFailure,
    /// Fire-and-forget persistence failed; only logged
    PersistenceFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::DetectionFailure => "detection failure",
            ErrorKind::ExtractionEmpty => "extraction empty",
            ErrorKind::CollaboratorFailure => "collaborator failure",
            ErrorKind::PersistenceFailure => "persistence failure",
        };
        f.write_str(name)
    }
}

/// Routing error with its kind
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind}: {message}")]
pub struct RoutingError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RoutingError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn collaborator(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CollaboratorFailure, message)
    }

    pub fn extraction_empty(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExtractionEmpty, message)
    }
}

/// A corner of a located machine-readable code
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CodePoint {
    pub x: f64,
    pub y: f64,
}

/// Outline of a located code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBox {
    pub points: Vec<CodePoint>,
}

/// What the code-decode collaborator found
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeDecodeResult {
    #[serde(alias = "hasQR", default)]
    pub has_code: bool,
    #[serde(default)]
    pub decoded_text: Option<String>,
    #[serde(rename = "box", default)]
    pub code_box: Option<CodeBox>,
}

impl CodeDecodeResult {
    /// The decoded payload, if a code was found and it carried text
    pub fn payload(&self) -> Option<&str> {
        if !self.has_code {
            return None;
        }
        self.decoded_text.as_deref().filter(|t| !t.is_empty())
    }
}

/// Result of routing one document; produced exactly once
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RoutingOutcome {
    /// A code was decoded and interpreted
    FastPathDecoded { text: String, result: Value },
    /// Text was extracted and answered over
    SlowPathExtracted { text: String, qa_result: Value },
    /// Not a legal registration; handed to the generic processor
    NotApplicable,
    Failed(RoutingError),
}

impl RoutingOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, RoutingOutcome::Failed(_))
    }
}

/// Router states; `NotApplicable`, `Persisted` and `Failed` are terminal
#[derive(Debug, Clone, PartialEq)]
pub enum RouteState {
    /// Document arrived; metadata not read yet
    Received(DocumentId),
    /// Metadata read; deciding whether the legal pipeline applies
    LegalDocCheck(DocumentRecord),
    /// A code payload was decoded
    FastPath {
        record: DocumentRecord,
        decoded_text: String,
    },
    /// No code; text extraction needed
    SlowPath(DocumentRecord),
    NotApplicable(DocumentRecord),
    /// Result handed to persistence
    Persisted {
        record: DocumentRecord,
        outcome: RoutingOutcome,
    },
    Failed {
        id: DocumentId,
        error: RoutingError,
    },
}

impl RouteState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RouteState::NotApplicable(_) | RouteState::Persisted { .. } | RouteState::Failed { .. }
        )
    }

    pub fn document_id(&self) -> &DocumentId {
        match self {
            RouteState::Received(id) | RouteState::Failed { id, .. } => id,
            RouteState::LegalDocCheck(record)
            | RouteState::SlowPath(record)
            | RouteState::NotApplicable(record)
            | RouteState::FastPath { record, .. }
            | RouteState::Persisted { record, .. } => &record.id,
        }
    }

    /// Outcome of a terminal state
    pub fn into_outcome(self) -> Option<RoutingOutcome> {
        match self {
            RouteState::Persisted { outcome, .. } => Some(outcome),
            RouteState::NotApplicable(_) => Some(RoutingOutcome::NotApplicable),
            RouteState::Failed { error, .. } => Some(RoutingOutcome::Failed(error)),
            _ => None,
        }
    }
}
