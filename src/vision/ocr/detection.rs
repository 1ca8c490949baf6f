// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text region detection
//!
//! `OcrDetectionModel` runs a DB (Differentiable Binarization) text
//! detector exported to ONNX and turns its probability map into
//! 4-point polygons in the pixel space of the image it was given.

use anyhow::{anyhow, Context, Result};
use image::{GrayImage, Luma, RgbImage};
use imageproc::rect::Rect;
use imageproc::region_labelling::{connected_components, Connectivity};
use ndarray::{Array2, IxDyn};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::geometry::Polygon;
use super::preprocessing::{detection_tensor, DetectionScale};

/// Components with a shorter side than this (in map pixels) are noise
const MIN_BOX_SIDE: u32 = 3;

/// Boxes whose left edges are within this many pixels share a line
const SAME_LINE_TOLERANCE: f32 = 10.0;

/// Finds text-bearing regions in an image
pub trait TextDetector: Send + Sync {
    /// Polygons in the pixel space of `image`, in reading order
    fn detect(&self, image: &RgbImage) -> Result<Vec<Polygon>>;

    /// Short identifier reported in responses and logs
    fn name(&self) -> &str;
}

/// DB post-processing parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionParams {
    /// Pixel threshold on the probability map
    pub db_thresh: f32,
    /// Minimum mean probability of a kept region
    pub box_thresh: f32,
    /// Expansion applied to shrunk DB regions
    pub unclip_ratio: f32,
    /// Cap on the longest side of the model input
    pub limit_side_len: u32,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            db_thresh: 0.20,
            box_thresh: 0.30,
            unclip_ratio: 1.8,
            limit_side_len: 2048,
        }
    }
}

/// ONNX DB text detector, CPU only
#[derive(Clone)]
pub struct OcrDetectionModel {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    params: DetectionParams,
}

impl std::fmt::Debug for OcrDetectionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrDetectionModel")
            .field("input_name", &self.input_name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl OcrDetectionModel {
    /// Load the detection model from an ONNX file
    ///
    /// # Errors
    /// Returns error if the file is missing or ONNX Runtime cannot load it
    pub async fn new<P: AsRef<Path>>(
        model_path: P,
        params: DetectionParams,
        intra_threads: usize,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("OCR detection model not found: {}", model_path.display());
        }

        info!("Loading OCR detection model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load OCR detection model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "x".to_string());

        info!("✅ OCR detection model loaded (input: {})", input_name);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            params,
        })
    }

    pub fn params(&self) -> DetectionParams {
        self.params
    }

    /// Run the model and return the probability map, shape `[H, W]`
    fn probability_map(&self, input: ndarray::Array4<f32>) -> Result<Array2<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("Detection session lock poisoned"))?;

        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Detection inference failed")?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let shape = output.shape().to_vec();
        debug!("Detection output shape: {:?}", shape);

        match shape.as_slice() {
            [1, 1, h, w] => Ok(Array2::from_shape_fn((*h, *w), |(y, x)| {
                output[IxDyn(&[0, 0, y, x])]
            })),
            [1, h, w] => Ok(Array2::from_shape_fn((*h, *w), |(y, x)| {
                output[IxDyn(&[0, y, x])]
            })),
            _ => anyhow::bail!("Unexpected detection output shape: {:?}", shape),
        }
    }
}

impl TextDetector for OcrDetectionModel {
    fn detect(&self, image: &RgbImage) -> Result<Vec<Polygon>> {
        let (tensor, scale) = detection_tensor(image, self.params.limit_side_len);
        let (tensor_h, tensor_w) = (tensor.shape()[2], tensor.shape()[3]);
        debug!(
            "Detection input {}x{} -> tensor {}x{}",
            image.width(),
            image.height(),
            tensor_w,
            tensor_h
        );

        let prob_map = self.probability_map(tensor)?;

        // The map is normally tensor-sized; fold any stride into the scale
        let (map_h, map_w) = prob_map.dim();
        let map_scale = DetectionScale {
            ratio_w: scale.ratio_w * map_w as f32 / tensor_w as f32,
            ratio_h: scale.ratio_h * map_h as f32 / tensor_h as f32,
        };

        let polygons = db_postprocess(&prob_map, &self.params, map_scale, image.dimensions());
        debug!("Detected {} text region(s)", polygons.len());
        Ok(polygons)
    }

    fn name(&self) -> &str {
        "db_onnx"
    }
}

/// Pixels of one labelled component on the probability map
#[derive(Debug, Clone, Copy)]
struct Region {
    min_x: u32,
    max_x: u32,
    min_y: u32,
    max_y: u32,
    score_sum: f32,
    pixels: u32,
}

impl Region {
    fn new(x: u32, y: u32, score: f32) -> Self {
        Self {
            min_x: x,
            max_x: x,
            min_y: y,
            max_y: y,
            score_sum: score,
            pixels: 1,
        }
    }

    fn add(&mut self, x: u32, y: u32, score: f32) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
        self.score_sum += score;
        self.pixels += 1;
    }

    fn bounds(&self) -> Rect {
        Rect::at(self.min_x as i32, self.min_y as i32)
            .of_size(self.max_x - self.min_x + 1, self.max_y - self.min_y + 1)
    }

    fn mean_score(&self) -> f32 {
        self.score_sum / self.pixels as f32
    }
}

/// Turn a DB probability map into polygons in image space
///
/// `scale` maps map pixels to image pixels; boxes are clamped to
/// `image_size`.
pub fn db_postprocess(
    prob_map: &Array2<f32>,
    params: &DetectionParams,
    scale: DetectionScale,
    image_size: (u32, u32),
) -> Vec<Polygon> {
    let (img_w, img_h) = (image_size.0 as f32, image_size.1 as f32);

    let mut polygons: Vec<Polygon> = label_regions(prob_map, params.db_thresh)
        .into_values()
        .filter(|region| region.mean_score() >= params.box_thresh)
        .map(|region| region.bounds())
        .filter(|rect| rect.width().min(rect.height()) >= MIN_BOX_SIDE)
        .filter_map(|rect| {
            let (x1, y1, x2, y2) = unclip(&rect, params.unclip_ratio)?;
            let (ix1, iy1) = scale.to_image(x1, y1);
            let (ix2, iy2) = scale.to_image(x2, y2);
            Some(Polygon::from_rect(
                ix1.clamp(0.0, img_w),
                iy1.clamp(0.0, img_h),
                ix2.clamp(0.0, img_w),
                iy2.clamp(0.0, img_h),
            ))
        })
        .collect();

    sort_reading_order(&mut polygons);
    polygons
}

/// 4-connected regions of `prob > thresh`, keyed by label
fn label_regions(prob_map: &Array2<f32>, thresh: f32) -> BTreeMap<u32, Region> {
    let (height, width) = prob_map.dim();
    let binary = GrayImage::from_fn(width as u32, height as u32, |x, y| {
        if prob_map[[y as usize, x as usize]] > thresh {
            Luma([255])
        } else {
            Luma([0])
        }
    });
    let labels = connected_components(&binary, Connectivity::Four, Luma([0u8]));

    let mut regions: BTreeMap<u32, Region> = BTreeMap::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label[0];
        if label == 0 {
            continue;
        }
        let score = prob_map[[y as usize, x as usize]];
        regions
            .entry(label)
            .and_modify(|region| region.add(x, y, score))
            .or_insert_with(|| Region::new(x, y, score));
    }
    regions
}

/// Expand a box by `area * ratio / perimeter` on every side
fn unclip(rect: &Rect, ratio: f32) -> Option<(f32, f32, f32, f32)> {
    let w = rect.width() as f32;
    let h = rect.height() as f32;
    let distance = w * h * ratio / (2.0 * (w + h));

    let (x1, y1) = (rect.left() as f32 - distance, rect.top() as f32 - distance);
    let (x2, y2) = (
        (rect.right() + 1) as f32 + distance,
        (rect.bottom() + 1) as f32 + distance,
    );

    let short_side = (x2 - x1).min(y2 - y1);
    (short_side >= (MIN_BOX_SIDE + 2) as f32).then_some((x1, y1, x2, y2))
}

/// Top-to-bottom, then left-to-right for boxes on the same line
fn sort_reading_order(polygons: &mut [Polygon]) {
    polygons.sort_by(|a, b| {
        let (ax, ay) = a.top_left();
        let (bx, by) = b.top_left();
        ay.total_cmp(&by).then(ax.total_cmp(&bx))
    });

    // One bubble pass per box is enough to fix near-equal tops
    for i in 0..polygons.len() {
        for j in (0..i).rev() {
            let (ax, ay) = polygons[j].top_left();
            let (bx, by) = polygons[j + 1].top_left();
            if (by - ay).abs() < SAME_LINE_TOLERANCE && bx < ax {
                polygons.swap(j, j + 1);
            } else {
                break;
            }
        }
    }
}
