// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Remote collaborator transport against local fake functions

use super::fake_functions::spawn;
use docroute_node::routing::{
    CodeDecoder, DecodeInterpreter, DocumentId, DocumentRecord, ErrorKind, GenericProcessor,
    QuestionAnswerer, RemoteCollaborators, RemoteFunction, ResultPersister, TextExtractor,
};
use serde_json::json;
use std::time::Duration;

fn function(name: &str, url: String) -> Option<RemoteFunction> {
    Some(RemoteFunction::new(name, &url, Duration::from_secs(2)).unwrap())
}

#[tokio::test]
async fn test_decoder_unwraps_envelope_and_alias() {
    let fake = spawn().await;
    let remote = RemoteCollaborators {
        code_decoder: function("code-decoder", fake.url("decode")),
        ..Default::default()
    };

    let found = remote
        .decode(&DocumentId::new("uploads", "forms/qr-1.png"))
        .await
        .unwrap();
    assert!(found.has_code);
    assert_eq!(found.payload(), Some("001099012345|Nguyen Van A"));
    assert_eq!(found.code_box.unwrap().points.len(), 1);

    let none = remote
        .decode(&DocumentId::new("uploads", "forms/plain.png"))
        .await
        .unwrap();
    assert_eq!(none.payload(), None);

    assert_eq!(
        fake.calls.of("decode")[0],
        json!({"bucket": "uploads", "key": "forms/qr-1.png"})
    );
}

#[tokio::test]
async fn test_payload_shapes() {
    let fake = spawn().await;
    let remote = RemoteCollaborators {
        interpreter: function("code-interpreter", fake.url("interpret")),
        question_answerer: function("question-answerer", fake.url("qa")),
        result_saver: function("result-saver", fake.url("save")),
        generic_processor: function("generic-processor", fake.url("generic")),
        ..Default::default()
    };
    let id = DocumentId::new("uploads", "a.pdf");

    let interpreted = remote.interpret("ABC").await.unwrap();
    assert_eq!(interpreted["source"], "ABC");

    let answered = remote.answer("some text").await.unwrap();
    assert_eq!(answered, json!({"answers": ["some text"]}));

    remote.persist(&id, json!({"k": 1})).await.unwrap();
    remote
        .process(&DocumentRecord::new(id.clone(), Some("invoice".to_string())))
        .await
        .unwrap();

    assert_eq!(fake.calls.of("interpret"), vec![json!({"decodedText": "ABC"})]);
    assert_eq!(fake.calls.of("qa"), vec![json!({"text": "some text"})]);
    assert_eq!(
        fake.calls.of("save"),
        vec![json!({"bucket": "uploads", "key": "a.pdf", "result": {"k": 1}})]
    );
    assert_eq!(
        fake.calls.of("generic"),
        vec![json!({"bucket": "uploads", "key": "a.pdf", "documentType": "invoice"})]
    );
}

#[tokio::test]
async fn test_error_statuses_are_collaborator_failures() {
    let fake = spawn().await;

    let http_error = RemoteFunction::new("decoder", &fake.url("decode"), Duration::from_secs(2)).unwrap();
    let err = http_error
        .invoke(&json!({"bucket": "b", "key": "broken.png"}))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::CollaboratorFailure);
    assert!(err.message.contains("500"));

    let envelope_error = RemoteFunction::new("failing", &fake.url("failing"), Duration::from_secs(2)).unwrap();
    let err = envelope_error.invoke(&json!({})).await.unwrap_err();
    assert!(err.message.contains("502"));

    let garbage = RemoteFunction::new("garbage", &fake.url("not-json"), Duration::from_secs(2)).unwrap();
    let err = garbage.invoke(&json!({})).await.unwrap_err();
    assert!(err.message.contains("invalid JSON"));
}

#[tokio::test]
async fn test_timeout_is_collaborator_failure() {
    let fake = spawn().await;
    let slow = RemoteFunction::new("slow", &fake.url("slow"), Duration::from_millis(200)).unwrap();
    let err = slow.invoke(&json!({})).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::CollaboratorFailure);
}

#[tokio::test]
async fn test_unconfigured_endpoints() {
    let remote = RemoteCollaborators::default();
    let id = DocumentId::new("b", "k");

    let err = remote.extract(&id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::CollaboratorFailure);
    assert!(remote.decode(&id).await.is_err());

    // Generic processing without an endpoint only logs
    remote
        .process(&DocumentRecord::new(id, Some("invoice".to_string())))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_trailing_slash_is_trimmed() {
    let fake = spawn().await;
    let with_slash = format!("{}/", fake.url("interpret"));
    let function = RemoteFunction::new("code-interpreter", &with_slash, Duration::from_secs(2)).unwrap();
    assert_eq!(function.endpoint(), fake.url("interpret"));
    assert!(function.invoke(&json!({"decodedText": "x"})).await.is_ok());
}
