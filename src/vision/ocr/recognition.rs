// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text recognition for cropped patches
//!
//! `OcrRecognitionModel` runs a CTC recognizer exported to ONNX. The
//! model emits a class distribution per time step; class 0 is the CTC
//! blank and class `i > 0` is line `i` of the character dictionary,
//! with a trailing space class.

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use ndarray::{Array2, IxDyn};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::recognition_tensor;

/// Reads the text in an image patch
pub trait TextRecognizer: Send + Sync {
    /// Text of the patch; may be empty
    fn recognize(&self, patch: &RgbImage) -> Result<String>;

    /// Short identifier reported in logs
    fn name(&self) -> &str;
}

/// Recognized text with confidence score
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecognizedText {
    pub text: String,
    /// Mean probability of the emitted characters (0.0-1.0)
    pub confidence: f32,
}

/// ONNX CTC text recognizer, CPU only
#[derive(Clone)]
pub struct OcrRecognitionModel {
    session: Arc<Mutex<Session>>,
    /// Characters for classes 1.., blank excluded
    dictionary: Arc<Vec<char>>,
    input_name: String,
}

impl std::fmt::Debug for OcrRecognitionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrRecognitionModel")
            .field("dictionary_size", &self.dictionary.len())
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl OcrRecognitionModel {
    /// Load the recognition model and its character dictionary
    ///
    /// # Errors
    /// Returns error if either file is missing or the model fails to load
    pub async fn new<P: AsRef<Path>>(model_path: P, dict_path: P, intra_threads: usize) -> Result<Self> {
        let model_path = model_path.as_ref();
        let dict_path = dict_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("OCR recognition model not found: {}", model_path.display());
        }
        if !dict_path.exists() {
            anyhow::bail!("OCR character dictionary not found: {}", dict_path.display());
        }

        info!("Loading OCR recognition model from {}", model_path.display());

        let contents = tokio::fs::read_to_string(dict_path)
            .await
            .context(format!("Failed to read dictionary: {}", dict_path.display()))?;
        let dictionary = parse_dictionary(&contents);
        info!("Loaded character dictionary with {} entries", dictionary.len());

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
                "Failed to load OCR recognition model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "x".to_string());

        info!("✅ OCR recognition model loaded (input: {})", input_name);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            dictionary: Arc::new(dictionary),
            input_name,
        })
    }

    pub fn dictionary_size(&self) -> usize {
        self.dictionary.len()
    }

    /// Recognize a patch and report the decoding confidence
    fn recognize_detailed(&self, patch: &RgbImage) -> Result<RecognizedText> {
        if patch.width() == 0 || patch.height() == 0 {
            return Ok(RecognizedText {
                text: String::new(),
                confidence: 0.0,
            });
        }

        let input = recognition_tensor(patch);

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("Recognition session lock poisoned"))?;

        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Recognition inference failed")?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        // [batch, seq_len, classes] or [seq_len, classes]
        let shape = output.shape().to_vec();
        let probs = match shape.as_slice() {
            [1, t, c] => Array2::from_shape_fn((*t, *c), |(i, j)| output[IxDyn(&[0, i, j])]),
            [t, c] => Array2::from_shape_fn((*t, *c), |(i, j)| output[IxDyn(&[i, j])]),
            _ => anyhow::bail!("Unexpected recognition output shape: {:?}", shape),
        };

        let recognized = ctc_greedy_decode(&probs, &self.dictionary);
        debug!(
            "Recognized {} char(s), confidence {:.3}",
            recognized.text.chars().count(),
            recognized.confidence
        );
        Ok(recognized)
    }
}

impl TextRecognizer for OcrRecognitionModel {
    fn recognize(&self, patch: &RgbImage) -> Result<String> {
        Ok(self.recognize_detailed(patch)?.text)
    }

    fn name(&self) -> &str {
        "ctc_onnx"
    }
}

/// One character per line; blank lines are skipped and a space class is appended
pub fn parse_dictionary(contents: &str) -> Vec<char> {
    let mut dictionary: Vec<char> = contents
        .lines()
        .filter_map(|line| line.trim_end_matches('\r').chars().next())
        .collect();
    dictionary.push(' ');
    dictionary
}

/// Best-path CTC decoding: argmax per step, collapse repeats, drop blanks
pub(crate) fn ctc_greedy_decode(probs: &Array2<f32>, dictionary: &[char]) -> RecognizedText {
    let mut text = String::new();
    let mut total = 0.0f32;
    let mut emitted = 0usize;
    let mut prev_class = 0usize;

    for step in probs.rows() {
        let (class, prob) = step
            .iter()
            .enumerate()
            .fold((0usize, f32::NEG_INFINITY), |best, (i, &p)| {
                if p > best.1 {
                    (i, p)
                } else {
                    best
                }
            });

        if class != 0 && class != prev_class {
            if let Some(&ch) = dictionary.get(class - 1) {
                text.push(ch);
                total += prob;
                emitted += 1;
            }
        }
        prev_class = class;
    }

    let confidence = if emitted == 0 {
        0.0
    } else {
        (total / emitted as f32).clamp(0.0, 1.0)
    };

    RecognizedText { text, confidence }
}
