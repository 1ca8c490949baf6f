// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-document routing state machine
//!
//! ```text
//! Received -> LegalDocCheck -> FastPath | SlowPath | NotApplicable
//!          FastPath | SlowPath -> Persisted | Failed
//! ```
//!
//! Every transition is one call to [`DocumentRouter::step`], so each can
//! be driven and tested on its own. Synchronous collaborator failures
//! end in `Failed` with the collaborator's error kind and are never
//! retried here. Persistence is spawned and not awaited by routing;
//! [`DocumentRouter::drain`] waits for saves still in flight before the
//! runtime goes away.

use serde_json::Value;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use super::collaborators::Collaborators;
use super::types::{
    DocumentId, DocumentRecord, RouteState, RoutingError, RoutingOutcome, DOCUMENT_TYPE_KEY,
};

/// Drives documents through the routing states
#[derive(Clone)]
pub struct DocumentRouter {
    collaborators: Collaborators,
    /// Detached persistence tasks; shared between clones
    persistence: TaskTracker,
}

impl DocumentRouter {
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            persistence: TaskTracker::new(),
        }
    }

    /// Number of persistence tasks still running
    pub fn pending_persists(&self) -> usize {
        self.persistence.len()
    }

    /// Wait for every persistence task spawned so far
    ///
    /// Routing keeps working during and after a drain.
    pub async fn drain(&self) {
        let pending = self.persistence.len();
        if pending > 0 {
            info!("Waiting for {} pending result save(s)", pending);
        }
        self.persistence.close();
        self.persistence.wait().await;
        self.persistence.reopen();
    }

    /// Route one document to a terminal state
    pub async fn route(&self, id: DocumentId) -> RoutingOutcome {
        info!("Routing document {}", id);
        let mut state = RouteState::Received(id);

        while !state.is_terminal() {
            state = self.step(state).await;
        }

        state.into_outcome().unwrap_or_else(|| {
            RoutingOutcome::Failed(RoutingError::collaborator(
                "router stopped in a non-terminal state",
            ))
        })
    }

    /// Apply one transition; terminal states are returned unchanged
    pub async fn step(&self, state: RouteState) -> RouteState {
        match state {
            RouteState::Received(id) => self.read_metadata(id).await,
            RouteState::LegalDocCheck(record) => self.check_legal(record).await,
            RouteState::FastPath {
                record,
                decoded_text,
            } => self.fast_path(record, decoded_text).await,
            RouteState::SlowPath(record) => self.slow_path(record).await,
            terminal => terminal,
        }
    }

    async fn read_metadata(&self, id: DocumentId) -> RouteState {
        match self.collaborators.metadata.metadata(&id).await {
            Ok(metadata) => {
                let document_type = metadata
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(DOCUMENT_TYPE_KEY))
                    .map(|(_, value)| value.clone());
                debug!("{}: document-type = {:?}", id, document_type);
                RouteState::LegalDocCheck(DocumentRecord::new(id, document_type))
            }
            Err(error) => fail(id, error),
        }
    }

    async fn check_legal(&self, record: DocumentRecord) -> RouteState {
        if !record.is_legal_registration() {
            info!(
                "{} is not a legal registration, using generic processing",
                record.id
            );
            return match self.collaborators.generic_processor.process(&record).await {
                Ok(()) => RouteState::NotApplicable(record),
                Err(error) => fail(record.id, error),
            };
        }

        info!("Processing legal registration {}", record.id);
        match self.collaborators.code_decoder.decode(&record.id).await {
            Ok(result) => match result.payload() {
                Some(text) => {
                    info!("{}: code detected ({} chars)", record.id, text.len());
                    let decoded_text = text.to_string();
                    RouteState::FastPath {
                        record,
                        decoded_text,
                    }
                }
                None => {
                    info!("{}: no code detected, extracting text", record.id);
                    RouteState::SlowPath(record)
                }
            },
            Err(error) => fail(record.id, error),
        }
    }

    async fn fast_path(&self, record: DocumentRecord, decoded_text: String) -> RouteState {
        match self.collaborators.interpreter.interpret(&decoded_text).await {
            Ok(result) => {
                self.persist_detached(record.id.clone(), result.clone());
                info!("{}: code path completed", record.id);
                RouteState::Persisted {
                    record,
                    outcome: RoutingOutcome::FastPathDecoded {
                        text: decoded_text,
                        result,
                    },
                }
            }
            Err(error) => fail(record.id, error),
        }
    }

    async fn slow_path(&self, record: DocumentRecord) -> RouteState {
        let text = match self.collaborators.text_extractor.extract(&record.id).await {
            Ok(text) if text.trim().is_empty() => {
                return fail(
                    record.id,
                    RoutingError::extraction_empty("text extraction returned no text"),
                );
            }
            Ok(text) => text,
            Err(error) => return fail(record.id, error),
        };

        info!(
            "{}: extracted {} chars, answering questions",
            record.id,
            text.len()
        );
        match self.collaborators.question_answerer.answer(&text).await {
            Ok(qa_result) => {
                self.persist_detached(record.id.clone(), qa_result.clone());
                info!("{}: extraction path completed", record.id);
                RouteState::Persisted {
                    record,
                    outcome: RoutingOutcome::SlowPathExtracted { text, qa_result },
                }
            }
            Err(error) => fail(record.id, error),
        }
    }

    /// Fire-and-forget persistence; failures are only logged
    fn persist_detached(&self, id: DocumentId, result: Value) {
        let persister = self.collaborators.persister.clone();
        self.persistence.spawn(async move {
            match persister.persist(&id, result).await {
                Ok(()) => debug!("{}: result persisted", id),
                Err(e) => warn!("{}: persisting result failed: {}", id, e),
            }
        });
    }
}

fn fail(id: DocumentId, error: RoutingError) -> RouteState {
    error!("Error processing {}: {}", id, error);
    RouteState::Failed { id, error }
}
