// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Document routing
//!
//! A legal registration is first checked for a machine-readable code
//! (fast path); without one its text is extracted and answered over
//! (slow path). Other documents go to generic processing.

pub mod batch;
pub mod collaborators;
pub mod local;
pub mod remote;
pub mod router;
pub mod types;

pub use batch::{handle_event, parse_event, process_batch, BatchReport, DocumentOutcome};
pub use collaborators::{
    CodeDecoder, Collaborators, DecodeInterpreter, GenericProcessor, MetadataLookup,
    QuestionAnswerer, ResultPersister, TextExtractor,
};
pub use local::PipelineTextExtractor;
pub use remote::{RemoteCollaborators, RemoteFunction};
pub use router::DocumentRouter;
pub use types::{
    CodeBox, CodeDecodeResult, CodePoint, DocumentId, DocumentRecord, ErrorKind, RouteState,
    RoutingError, RoutingOutcome, DOCUMENT_TYPE_KEY, LEGAL_REGISTRATION,
};
