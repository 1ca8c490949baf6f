// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration
//!
//! Read from environment variables (optionally via a `.env` file) or
//! from a TOML file with the same structure.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::routing::{
    Collaborators, DocumentRouter, PipelineTextExtractor, RemoteCollaborators, RemoteFunction,
    TextExtractor,
};
use crate::storage::LocalDocumentStore;
use crate::vision::ocr::DetectionParams;
use crate::vision::{OcrModelConfig, OcrModelRegistry};

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub ocr: OcrConfig,
    pub endpoints: EndpointConfig,
    /// Root of the local document store
    pub document_root: PathBuf,
}

/// HTTP listener
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// OCR models and detector post-processing
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub model_dir: PathBuf,
    pub intra_threads: usize,
    pub det_db_thresh: f32,
    pub det_db_box_thresh: f32,
    pub det_db_unclip_ratio: f32,
    pub det_limit_side_len: u32,
}

/// Collaborator endpoints; unset means not configured
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub code_decoder_url: Option<String>,
    pub code_interpreter_url: Option<String>,
    /// When unset, text extraction runs the in-process OCR pipeline
    pub text_extractor_url: Option<String>,
    pub qa_url: Option<String>,
    pub result_saver_url: Option<String>,
    pub generic_processor_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        let params = DetectionParams::default();
        Self {
            model_dir: PathBuf::from("./models/ocr"),
            intra_threads: 4,
            det_db_thresh: params.db_thresh,
            det_db_box_thresh: params.box_thresh,
            det_db_unclip_ratio: params.unclip_ratio,
            det_limit_side_len: params.limit_side_len,
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            code_decoder_url: None,
            code_interpreter_url: None,
            text_extractor_url: None,
            qa_url: None,
            result_saver_url: None,
            generic_processor_url: None,
            timeout_secs: 120,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            ocr: OcrConfig::default(),
            endpoints: EndpointConfig::default(),
            document_root: PathBuf::from("./documents"),
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through a key lookup (environment-shaped)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let url = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            server: ServerConfig {
                host: lookup("API_HOST").unwrap_or(defaults.server.host),
                port: parse_var(&lookup, "API_PORT").unwrap_or(defaults.server.port),
            },
            ocr: OcrConfig {
                model_dir: lookup("OCR_MODEL_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.ocr.model_dir),
                intra_threads: parse_var(&lookup, "OCR_INTRA_THREADS")
                    .unwrap_or(defaults.ocr.intra_threads),
                det_db_thresh: parse_var(&lookup, "DET_DB_THRESH")
                    .unwrap_or(defaults.ocr.det_db_thresh),
                det_db_box_thresh: parse_var(&lookup, "DET_DB_BOX_THRESH")
                    .unwrap_or(defaults.ocr.det_db_box_thresh),
                det_db_unclip_ratio: parse_var(&lookup, "DET_DB_UNCLIP_RATIO")
                    .unwrap_or(defaults.ocr.det_db_unclip_ratio),
                det_limit_side_len: parse_var(&lookup, "DET_LIMIT_SIDE_LEN")
                    .unwrap_or(defaults.ocr.det_limit_side_len),
            },
            endpoints: EndpointConfig {
                code_decoder_url: url("CODE_DECODER_URL"),
                code_interpreter_url: url("CODE_INTERPRETER_URL"),
                text_extractor_url: url("TEXT_EXTRACTOR_URL"),
                qa_url: url("QA_URL"),
                result_saver_url: url("RESULT_SAVER_URL"),
                generic_processor_url: url("GENERIC_PROCESSOR_URL"),
                timeout_secs: parse_var(&lookup, "REMOTE_TIMEOUT_SECS")
                    .unwrap_or(defaults.endpoints.timeout_secs),
            },
            document_root: lookup("DOCUMENT_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.document_root),
        }
    }

    /// Load configuration from a TOML file; missing keys take defaults
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("API port must be greater than 0".to_string());
        }
        if self.ocr.intra_threads == 0 {
            return Err("OCR intra threads must be greater than 0".to_string());
        }
        for (name, value) in [
            ("DB threshold", self.ocr.det_db_thresh),
            ("DB box threshold", self.ocr.det_db_box_thresh),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be within [0, 1], got {}", name, value));
            }
        }
        if self.ocr.det_db_unclip_ratio <= 0.0 {
            return Err("Unclip ratio must be greater than 0".to_string());
        }
        if self.ocr.det_limit_side_len < 32 {
            return Err("Detection side limit must be at least 32".to_string());
        }
        if self.endpoints.timeout_secs == 0 {
            return Err("Remote timeout must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn detection_params(&self) -> DetectionParams {
        DetectionParams {
            db_thresh: self.ocr.det_db_thresh,
            box_thresh: self.ocr.det_db_box_thresh,
            unclip_ratio: self.ocr.det_db_unclip_ratio,
            limit_side_len: self.ocr.det_limit_side_len,
        }
    }

    pub fn ocr_model_config(&self) -> OcrModelConfig {
        OcrModelConfig {
            model_dir: self.ocr.model_dir.clone(),
            intra_threads: self.ocr.intra_threads,
            detection: self.detection_params(),
        }
    }

    /// Remote collaborators for every configured endpoint
    pub fn remote_collaborators(&self) -> Result<RemoteCollaborators> {
        let timeout = Duration::from_secs(self.endpoints.timeout_secs);
        let function = |name: &str, url: &Option<String>| -> Result<Option<RemoteFunction>> {
            url.as_deref()
                .map(|url| RemoteFunction::new(name, url, timeout))
                .transpose()
        };

        let endpoints = &self.endpoints;
        Ok(RemoteCollaborators {
            code_decoder: function("code-decoder", &endpoints.code_decoder_url)?,
            interpreter: function("code-interpreter", &endpoints.code_interpreter_url)?,
            text_extractor: function("text-extractor", &endpoints.text_extractor_url)?,
            question_answerer: function("question-answerer", &endpoints.qa_url)?,
            result_saver: function("result-saver", &endpoints.result_saver_url)?,
            generic_processor: function("generic-processor", &endpoints.generic_processor_url)?,
        })
    }

    /// Wire a router over the local document store and remote endpoints
    ///
    /// Without a text extractor endpoint, text is extracted in-process
    /// with the shared OCR models.
    pub fn document_router(&self, models: Arc<OcrModelRegistry>) -> Result<DocumentRouter> {
        let store = Arc::new(LocalDocumentStore::new(self.document_root.clone()));
        let remote = Arc::new(self.remote_collaborators()?);

        let text_extractor: Arc<dyn TextExtractor> = if remote.text_extractor.is_some() {
            remote.clone()
        } else {
            info!("No text extractor endpoint; extracting text in-process");
            Arc::new(PipelineTextExtractor::new(store.clone(), models))
        };

        Ok(DocumentRouter::new(Collaborators {
            metadata: store,
            code_decoder: remote.clone(),
            interpreter: remote.clone(),
            text_extractor,
            question_answerer: remote.clone(),
            persister: remote.clone(),
            generic_processor: remote,
        }))
    }
}
