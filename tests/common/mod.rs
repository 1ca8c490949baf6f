// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared fakes for the integration tests

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use docroute_node::vision::ocr::{Polygon, TextDetector, TextRecognizer};
use docroute_node::vision::{ModelLoader, OcrModelRegistry, SourcePage};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Detector returning fixed polygons, or an error
pub struct FixedDetector {
    polygons: Vec<Polygon>,
    fail: bool,
    pub calls: AtomicUsize,
}

impl FixedDetector {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        Self {
            polygons,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            polygons: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }
}

impl TextDetector for FixedDetector {
    fn detect(&self, _image: &RgbImage) -> Result<Vec<Polygon>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("detector exploded"));
        }
        Ok(self.polygons.clone())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Recognizer answering from a script, in call order
///
/// Once the script runs out every call returns `fallback_text`.
pub struct ScriptedRecognizer {
    script: Mutex<VecDeque<Result<String, String>>>,
    fallback_text: String,
    seen: Mutex<Vec<(u32, u32)>>,
}

impl ScriptedRecognizer {
    pub fn new(script: Vec<Result<&str, &str>>, fallback_text: &str) -> Self {
        Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            fallback_text: fallback_text.to_string(),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Dimensions of every patch passed in, in call order
    pub fn seen(&self) -> Vec<(u32, u32)> {
        self.seen.lock().unwrap().clone()
    }
}

impl TextRecognizer for ScriptedRecognizer {
    fn recognize(&self, patch: &RgbImage) -> Result<String> {
        self.seen
            .lock()
            .unwrap()
            .push((patch.width(), patch.height()));
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(e)) => Err(anyhow!(e)),
            None => Ok(self.fallback_text.clone()),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Loader handing out fixed models and counting loads
pub struct FakeLoader {
    detector: Arc<dyn TextDetector>,
    recognizer: Arc<dyn TextRecognizer>,
    pub loads: AtomicUsize,
}

impl FakeLoader {
    pub fn new(detector: Arc<dyn TextDetector>, recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            detector,
            recognizer,
            loads: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ModelLoader for FakeLoader {
    async fn load_detector(&self) -> Result<Arc<dyn TextDetector>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.detector.clone())
    }

    async fn load_recognizer(&self) -> Result<Arc<dyn TextRecognizer>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.recognizer.clone())
    }
}

/// Registry whose detector finds nothing and whose recognizer always
/// reads `text`
pub fn fake_registry(text: &str) -> Arc<OcrModelRegistry> {
    let loader = FakeLoader::new(
        Arc::new(FixedDetector::new(Vec::new())),
        Arc::new(ScriptedRecognizer::new(Vec::new(), text)),
    );
    Arc::new(OcrModelRegistry::new(Arc::new(loader)))
}

pub fn blank_page(width: u32, height: u32) -> SourcePage {
    SourcePage::new(RgbImage::from_pixel(width, height, Rgb([245, 245, 245])))
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([250, 250, 250]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

pub fn png_base64(width: u32, height: u32) -> String {
    STANDARD.encode(png_bytes(width, height))
}
