// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Batch entry: queue messages carrying storage upload events
//!
//! Documents in a batch are routed one after another. A failed document
//! is logged and counted; it never stops the rest of the batch.

use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use tracing::{error, info, warn};

use super::router::DocumentRouter;
use super::types::{DocumentId, RoutingOutcome};

/// Outcome of one document in a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentOutcome {
    pub document: DocumentId,
    pub outcome: RoutingOutcome,
}

/// Summary of a processed batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    /// Documents that reached a non-failed terminal state
    pub processed: usize,
    pub failed: usize,
    pub outcomes: Vec<DocumentOutcome>,
}

/// Collect the documents referenced by a batch event
///
/// Accepts queue records whose `body` holds a storage event (as a JSON
/// string or object), or storage records directly. Malformed records are
/// logged and skipped.
pub fn parse_event(event: &Value) -> Vec<DocumentId> {
    let mut ids = Vec::new();

    let Some(records) = event.get("Records").and_then(Value::as_array) else {
        warn!("Event has no Records array");
        return ids;
    };

    for record in records {
        if record.get("s3").is_some() {
            push_storage_record(record, &mut ids);
            continue;
        }

        let storage_event: Cow<'_, Value> = match record.get("body") {
            Some(Value::String(body)) => match serde_json::from_str(body) {
                Ok(parsed) => Cow::Owned(parsed),
                Err(e) => {
                    warn!("Skipping record with unparseable body: {}", e);
                    continue;
                }
            },
            Some(body) => Cow::Borrowed(body),
            None => Cow::Borrowed(record),
        };

        let storage_records = storage_event
            .get("Records")
            .and_then(Value::as_array)
            .filter(|r| !r.is_empty());
        let Some(storage_records) = storage_records else {
            warn!("No storage records found in event record");
            continue;
        };

        for storage_record in storage_records {
            push_storage_record(storage_record, &mut ids);
        }
    }

    ids
}

fn push_storage_record(record: &Value, ids: &mut Vec<DocumentId>) {
    let bucket = record
        .pointer("/s3/bucket/name")
        .and_then(Value::as_str);
    let key = record.pointer("/s3/object/key").and_then(Value::as_str);

    match (bucket, key) {
        (Some(bucket), Some(key)) => ids.push(DocumentId::new(bucket, decode_object_key(key))),
        _ => warn!("Storage record without bucket/key, skipping"),
    }
}

/// Undo the form-style encoding of object keys in storage events
pub fn decode_object_key(key: &str) -> String {
    let spaced = key.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

/// Route every document in order, isolating failures
pub async fn process_batch(router: &DocumentRouter, ids: Vec<DocumentId>) -> BatchReport {
    let mut report = BatchReport::default();

    for id in ids {
        info!("Processing document {}", id);
        let outcome = router.route(id.clone()).await;

        if let RoutingOutcome::Failed(ref e) = outcome {
            error!("Document {} failed: {}", id, e);
            report.failed += 1;
        } else {
            report.processed += 1;
        }
        report.outcomes.push(DocumentOutcome {
            document: id,
            outcome,
        });
    }

    info!(
        "Batch done: {} processed, {} failed",
        report.processed, report.failed
    );
    report
}

/// Parse a batch event and route its documents
pub async fn handle_event(router: &DocumentRouter, event: &Value) -> BatchReport {
    let ids = parse_event(event);
    info!("Event references {} document(s)", ids.len());
    process_batch(router, ids).await
}
