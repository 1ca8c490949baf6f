// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Lazy, shared model initialization

use crate::common::{blank_page, FakeLoader, FixedDetector, ScriptedRecognizer};
use docroute_node::vision::{OcrModelConfig, OcrModelRegistry};
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn loader() -> Arc<FakeLoader> {
    Arc::new(FakeLoader::new(
        Arc::new(FixedDetector::new(Vec::new())),
        Arc::new(ScriptedRecognizer::new(Vec::new(), "text")),
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_use_loads_each_model_once() {
    let loader = loader();
    let registry = Arc::new(OcrModelRegistry::new(loader.clone()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            tokio::spawn(async move { registry.pipeline().await.is_ok() })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap());
    }

    // One detector load plus one recognizer load
    assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
    let status = registry.status();
    assert!(status.detector_initialized);
    assert!(status.predictor_initialized);
}

#[tokio::test]
async fn test_pipeline_from_registry_runs() {
    let registry = OcrModelRegistry::new(loader());
    assert!(!registry.status().detector_initialized);

    let pipeline = registry.pipeline().await.unwrap();
    let result = tokio::task::spawn_blocking(move || pipeline.process(&blank_page(100, 80)))
        .await
        .unwrap();
    assert_eq!(result.text, "text");
}

#[tokio::test]
async fn test_missing_model_files_leave_registry_uninitialized() {
    let dir = tempfile::tempdir().unwrap();
    let registry = OcrModelRegistry::from_config(OcrModelConfig {
        model_dir: dir.path().to_path_buf(),
        ..Default::default()
    });

    assert!(registry.pipeline().await.is_err());
    let status = registry.status();
    assert!(!status.detector_initialized);
    assert!(!status.predictor_initialized);
}

#[tokio::test]
#[ignore] // Requires ONNX models in ./models/ocr
async fn test_real_models_read_blank_page_as_empty() {
    let registry = OcrModelRegistry::from_config(OcrModelConfig::default());
    let pipeline = registry.pipeline().await.expect("models should load");
    let result = tokio::task::spawn_blocking(move || pipeline.process(&blank_page(800, 600)))
        .await
        .unwrap();
    assert!(result.text.trim().is_empty());
}
