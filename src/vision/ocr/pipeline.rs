// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detect-then-recognize pipeline for one document page
//!
//! Normalizer -> Detector -> Mapper -> Extractor -> Recognizer -> Aggregator.
//! The pipeline never fails on a page: detection errors and per-region
//! recognition errors are logged and recovered, and the whole-image
//! fallback yields empty text at worst.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::aggregation::aggregate_with_fallback;
use super::detection::TextDetector;
use super::extraction::extract_patch;
use super::geometry::{map_polygons, ViewSize};
use super::preprocessing::{binarize_for_detection, normalize, ViewMode};
use super::recognition::TextRecognizer;
use crate::vision::image_utils::SourcePage;

/// Label for the canonical detector input in responses
pub const DETECTION_METHOD: &str = "preprocessed_adaptive_threshold";

/// Result of running the pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OcrResult {
    /// Recognized lines joined with `\n`
    pub text: String,
    /// Trimmed non-empty lines in reading order
    pub lines: Vec<String>,
    /// Polygons returned by the detector
    pub boxes_detected: usize,
    /// Regions that survived mapping and were sent to the recognizer
    pub regions_recognized: usize,
    /// Whether the whole-image fallback produced the text
    pub used_fallback: bool,
    pub detection_view: Option<ViewSize>,
    pub recognition_view: Option<ViewSize>,
    pub processing_time_ms: u64,
}

/// Combined OCR pipeline over an injected detector and recognizer
#[derive(Clone)]
pub struct OcrPipeline {
    detector: Arc<dyn TextDetector>,
    recognizer: Arc<dyn TextRecognizer>,
}

impl std::fmt::Debug for OcrPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrPipeline")
            .field("detector", &self.detector.name())
            .field("recognizer", &self.recognizer.name())
            .finish()
    }
}

impl OcrPipeline {
    pub fn new(detector: Arc<dyn TextDetector>, recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            detector,
            recognizer,
        }
    }

    /// Extract the text of one page
    pub fn process(&self, page: &SourcePage) -> OcrResult {
        let start = Instant::now();
        info!("OCR page {}x{}", page.width(), page.height());

        let detection_view = normalize(page, ViewMode::Detection);
        let recognition_view = normalize(page, ViewMode::Recognition);
        let det_size = ViewSize::of(&detection_view);
        let rec_size = ViewSize::of(&recognition_view);
        debug!(
            "Views: detection {}x{}, recognition {}x{}",
            det_size.width, det_size.height, rec_size.width, rec_size.height
        );

        let detector_input = binarize_for_detection(&detection_view);
        let polygons = match self.detector.detect(&detector_input) {
            Ok(polygons) => polygons,
            Err(e) => {
                warn!(
                    "Detection failed with {}, falling back to whole image: {:#}",
                    self.detector.name(),
                    e
                );
                Vec::new()
            }
        };
        let boxes_detected = polygons.len();

        let regions = map_polygons(&polygons, det_size, rec_size);
        info!(
            "Detected {} box(es), {} usable region(s)",
            boxes_detected,
            regions.len()
        );

        let entries: Vec<(usize, Option<String>)> = regions
            .iter()
            .map(|region| {
                let patch = extract_patch(&recognition_view, region);
                match self.recognizer.recognize(&patch) {
                    Ok(text) => {
                        debug!("Region {}: {} char(s)", region.index, text.trim().len());
                        (region.index, Some(text))
                    }
                    Err(e) => {
                        warn!("Region {}: recognition failed: {:#}", region.index, e);
                        (region.index, None)
                    }
                }
            })
            .collect();

        let aggregated =
            aggregate_with_fallback(entries, || self.recognizer.recognize(&recognition_view));

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "OCR done: {} line(s), {} char(s), fallback={}, {}ms",
            aggregated.lines.len(),
            aggregated.text.len(),
            aggregated.used_fallback,
            processing_time_ms
        );

        OcrResult {
            text: aggregated.text,
            lines: aggregated.lines,
            boxes_detected,
            regions_recognized: regions.len(),
            used_fallback: aggregated.used_fallback,
            detection_view: Some(det_size),
            recognition_view: Some(rec_size),
            processing_time_ms,
        }
    }

    /// Extract every page and join non-empty page texts with `\n`
    ///
    /// View sizes are those of the first page.
    pub fn process_pages(&self, pages: &[SourcePage]) -> OcrResult {
        let mut combined = OcrResult::default();

        for (number, page) in pages.iter().enumerate() {
            let result = self.process(page);
            debug!("Page {}: {} line(s)", number + 1, result.lines.len());

            if combined.detection_view.is_none() {
                combined.detection_view = result.detection_view;
                combined.recognition_view = result.recognition_view;
            }
            if !result.text.is_empty() {
                if !combined.text.is_empty() {
                    combined.text.push('\n');
                }
                combined.text.push_str(&result.text);
            }
            combined.lines.extend(result.lines);
            combined.boxes_detected += result.boxes_detected;
            combined.regions_recognized += result.regions_recognized;
            combined.used_fallback |= result.used_fallback;
            combined.processing_time_ms += result.processing_time_ms;
        }

        combined
    }
}
