// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use docroute_node::routing::{DocumentId, ErrorKind, MetadataLookup, RoutingError};
use docroute_node::storage::{DocumentStore, LocalDocumentStore, StorageError};
use std::collections::HashMap;
use tempfile::TempDir;

fn setup() -> (TempDir, LocalDocumentStore) {
    let dir = TempDir::new().unwrap();
    let store = LocalDocumentStore::new(dir.path());
    (dir, store)
}

#[tokio::test]
async fn test_put_then_fetch() {
    let (_dir, store) = setup();
    let id = DocumentId::new("uploads", "forms/2025/reg.png");

    store.put(&id, b"bytes", &HashMap::new()).await.unwrap();

    assert_eq!(store.fetch(&id).await.unwrap(), b"bytes");
    assert!(DocumentStore::metadata(&store, &id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_metadata_keys_are_lowercased() {
    let (_dir, store) = setup();
    let id = DocumentId::new("uploads", "reg.pdf");
    let metadata = HashMap::from([
        ("Document-Type".to_string(), "Legal Registration".to_string()),
        ("X-Uploader".to_string(), "clerk".to_string()),
    ]);

    store.put(&id, b"%PDF", &metadata).await.unwrap();

    let read = DocumentStore::metadata(&store, &id).await.unwrap();
    assert_eq!(read.get("document-type").map(String::as_str), Some("Legal Registration"));
    assert_eq!(read.get("x-uploader").map(String::as_str), Some("clerk"));
}

#[tokio::test]
async fn test_missing_document() {
    let (_dir, store) = setup();
    let id = DocumentId::new("uploads", "nope.png");

    assert!(matches!(store.fetch(&id).await, Err(StorageError::NotFound(_))));
    assert!(matches!(
        DocumentStore::metadata(&store, &id).await,
        Err(StorageError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_corrupt_metadata_file() {
    let (dir, store) = setup();
    let id = DocumentId::new("uploads", "reg.png");
    store.put(&id, b"png", &HashMap::new()).await.unwrap();
    tokio::fs::write(dir.path().join("uploads/reg.png.metadata.json"), b"[1, 2]")
        .await
        .unwrap();

    let err = DocumentStore::metadata(&store, &id).await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidMetadata(_)));
}

#[tokio::test]
async fn test_metadata_lookup_errors_carry_kind() {
    let (_dir, store) = setup();

    let err: RoutingError = MetadataLookup::metadata(&store, &DocumentId::new("uploads", "../x"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);

    let err = MetadataLookup::metadata(&store, &DocumentId::new("uploads", "absent.png"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::CollaboratorFailure);
}

#[tokio::test]
async fn test_put_rejects_escaping_paths() {
    let (dir, store) = setup();
    let result = store
        .put(&DocumentId::new("uploads", "../../escape.png"), b"x", &HashMap::new())
        .await;
    assert!(matches!(result, Err(StorageError::InvalidPath(_))));
    assert!(!dir.path().join("escape.png").exists());
}
