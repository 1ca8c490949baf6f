// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process-wide OCR model instances
//!
//! Models are expensive to construct, so the registry builds each one
//! on first demand and hands out shared handles afterwards. Concurrent
//! first use initializes at most once; a failed load is not cached and
//! is retried by the next caller.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::vision::ocr::{
    DetectionParams, OcrDetectionModel, OcrPipeline, OcrRecognitionModel, TextDetector,
    TextRecognizer,
};

/// Where the OCR models live and how to run them
#[derive(Debug, Clone, PartialEq)]
pub struct OcrModelConfig {
    /// Directory holding det_model.onnx, rec_model.onnx and dict.txt
    pub model_dir: PathBuf,
    pub intra_threads: usize,
    pub detection: DetectionParams,
}

impl Default for OcrModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("./models/ocr"),
            intra_threads: 4,
            detection: DetectionParams::default(),
        }
    }
}

impl OcrModelConfig {
    pub fn det_model_path(&self) -> PathBuf {
        self.model_dir.join("det_model.onnx")
    }

    pub fn rec_model_path(&self) -> PathBuf {
        self.model_dir.join("rec_model.onnx")
    }

    pub fn dict_path(&self) -> PathBuf {
        self.model_dir.join("dict.txt")
    }
}

/// Constructs detector and recognizer instances
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load_detector(&self) -> Result<Arc<dyn TextDetector>>;
    async fn load_recognizer(&self) -> Result<Arc<dyn TextRecognizer>>;
}

/// Loads the ONNX models described by an [`OcrModelConfig`]
#[derive(Debug, Clone)]
pub struct OnnxModelLoader {
    config: OcrModelConfig,
}

impl OnnxModelLoader {
    pub fn new(config: OcrModelConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ModelLoader for OnnxModelLoader {
    async fn load_detector(&self) -> Result<Arc<dyn TextDetector>> {
        let model = OcrDetectionModel::new(
            self.config.det_model_path(),
            self.config.detection,
            self.config.intra_threads,
        )
        .await?;
        Ok(Arc::new(model))
    }

    async fn load_recognizer(&self) -> Result<Arc<dyn TextRecognizer>> {
        let model = OcrRecognitionModel::new(
            self.config.rec_model_path(),
            self.config.dict_path(),
            self.config.intra_threads,
        )
        .await?;
        Ok(Arc::new(model))
    }
}

/// Initialization status reported by the health probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelStatus {
    pub detector_initialized: bool,
    pub predictor_initialized: bool,
}

/// Lazily initialized, shared detector and recognizer
pub struct OcrModelRegistry {
    loader: Arc<dyn ModelLoader>,
    detector: OnceCell<Arc<dyn TextDetector>>,
    recognizer: OnceCell<Arc<dyn TextRecognizer>>,
}

impl std::fmt::Debug for OcrModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrModelRegistry")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl OcrModelRegistry {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            detector: OnceCell::new(),
            recognizer: OnceCell::new(),
        }
    }

    /// Registry backed by the ONNX models in `config.model_dir`
    pub fn from_config(config: OcrModelConfig) -> Self {
        Self::new(Arc::new(OnnxModelLoader::new(config)))
    }

    pub async fn detector(&self) -> Result<Arc<dyn TextDetector>> {
        let detector = self
            .detector
            .get_or_try_init(|| async {
                info!("Initializing text detector");
                self.loader.load_detector().await.map_err(|e| {
                    warn!("⚠️ Text detector failed to load: {:#}", e);
                    e
                })
            })
            .await?;
        Ok(Arc::clone(detector))
    }

    pub async fn recognizer(&self) -> Result<Arc<dyn TextRecognizer>> {
        let recognizer = self
            .recognizer
            .get_or_try_init(|| async {
                info!("Initializing text recognizer");
                self.loader.load_recognizer().await.map_err(|e| {
                    warn!("⚠️ Text recognizer failed to load: {:#}", e);
                    e
                })
            })
            .await?;
        Ok(Arc::clone(recognizer))
    }

    /// Pipeline over the shared models, initializing them on first use
    pub async fn pipeline(&self) -> Result<OcrPipeline> {
        let detector = self.detector().await?;
        let recognizer = self.recognizer().await?;
        Ok(OcrPipeline::new(detector, recognizer))
    }

    pub fn status(&self) -> ModelStatus {
        ModelStatus {
            detector_initialized: self.detector.initialized(),
            predictor_initialized: self.recognizer.initialized(),
        }
    }
}
