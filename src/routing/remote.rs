// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Collaborators reached as JSON functions over HTTP
//!
//! Each collaborator is one endpoint taking a JSON payload. Responses may
//! come back wrapped in a function envelope
//! `{"statusCode": 200, "body": "<json string>"}`, which is unwrapped.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use super::collaborators::{
    CodeDecoder, DecodeInterpreter, GenericProcessor, QuestionAnswerer, ResultPersister,
    TextExtractor,
};
use super::types::{CodeDecodeResult, DocumentId, DocumentRecord, RoutingError};

/// One remote JSON function
#[derive(Debug, Clone)]
pub struct RemoteFunction {
    client: Client,
    endpoint: String,
    name: String,
}

impl RemoteFunction {
    pub fn new(name: &str, endpoint: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let endpoint = endpoint.trim_end_matches('/').to_string();
        info!("Remote function {} configured: {}", name, endpoint);

        Ok(Self {
            client,
            endpoint,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST `payload` and return the unwrapped response body
    pub async fn invoke(&self, payload: &Value) -> Result<Value, RoutingError> {
        debug!("Invoking {} at {}", self.name, self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|e| RoutingError::collaborator(format!("{}: {}", self.name, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RoutingError::collaborator(format!("{}: {}", self.name, e)))?;

        if !status.is_success() {
            return Err(RoutingError::collaborator(format!(
                "{} returned HTTP {}: {}",
                self.name, status, text
            )));
        }

        let value: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| {
                RoutingError::collaborator(format!("{} returned invalid JSON: {}", self.name, e))
            })?
        };

        unwrap_envelope(value).map_err(|e| RoutingError::collaborator(format!("{}: {}", self.name, e)))
    }
}

/// Strip a `{statusCode, body}` envelope; a status of 400 or more is an error
pub fn unwrap_envelope(value: Value) -> Result<Value, String> {
    let Some(status) = value.get("statusCode").and_then(Value::as_u64) else {
        return Ok(value);
    };

    let body = match value.get("body") {
        Some(Value::String(body)) => {
            serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.clone()))
        }
        Some(body) => body.clone(),
        None => Value::Null,
    };

    if status >= 400 {
        return Err(format!("function returned status {}: {}", status, body));
    }
    Ok(body)
}

/// All router collaborators backed by remote functions
///
/// Endpoints are optional; calling one that is not configured fails
/// with a collaborator error, except the generic processor which only
/// logs.
#[derive(Debug, Clone, Default)]
pub struct RemoteCollaborators {
    pub code_decoder: Option<RemoteFunction>,
    pub interpreter: Option<RemoteFunction>,
    pub text_extractor: Option<RemoteFunction>,
    pub question_answerer: Option<RemoteFunction>,
    pub result_saver: Option<RemoteFunction>,
    pub generic_processor: Option<RemoteFunction>,
}

fn configured<'a>(
    function: &'a Option<RemoteFunction>,
    role: &str,
) -> Result<&'a RemoteFunction, RoutingError> {
    function
        .as_ref()
        .ok_or_else(|| RoutingError::collaborator(format!("{} endpoint not configured", role)))
}

fn location(id: &DocumentId) -> Value {
    json!({"bucket": id.container, "key": id.path})
}

#[async_trait]
impl CodeDecoder for RemoteCollaborators {
    async fn decode(&self, id: &DocumentId) -> Result<CodeDecodeResult, RoutingError> {
        let function = configured(&self.code_decoder, "code decoder")?;
        let value = function.invoke(&location(id)).await?;
        serde_json::from_value(value).map_err(|e| {
            RoutingError::collaborator(format!("code decoder returned unexpected payload: {}", e))
        })
    }
}

#[async_trait]
impl DecodeInterpreter for RemoteCollaborators {
    async fn interpret(&self, decoded_text: &str) -> Result<Value, RoutingError> {
        let function = configured(&self.interpreter, "code interpreter")?;
        function.invoke(&json!({"decodedText": decoded_text})).await
    }
}

#[async_trait]
impl TextExtractor for RemoteCollaborators {
    async fn extract(&self, id: &DocumentId) -> Result<String, RoutingError> {
        let function = configured(&self.text_extractor, "text extractor")?;
        let value = function.invoke(&location(id)).await?;
        Ok(value
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }
}

#[async_trait]
impl QuestionAnswerer for RemoteCollaborators {
    async fn answer(&self, text: &str) -> Result<Value, RoutingError> {
        let function = configured(&self.question_answerer, "question answerer")?;
        function.invoke(&json!({"text": text})).await
    }
}

#[async_trait]
impl ResultPersister for RemoteCollaborators {
    async fn persist(&self, id: &DocumentId, result: Value) -> Result<(), RoutingError> {
        let function = configured(&self.result_saver, "result saver")?;
        let payload = json!({"bucket": id.container, "key": id.path, "result": result});
        function.invoke(&payload).await.map(|_| ())
    }
}

#[async_trait]
impl GenericProcessor for RemoteCollaborators {
    async fn process(&self, record: &DocumentRecord) -> Result<(), RoutingError> {
        let Some(function) = &self.generic_processor else {
            info!("No generic processor configured, {} left as is", record.id);
            return Ok(());
        };
        let payload = json!({
            "bucket": record.id.container,
            "key": record.id.path,
            "documentType": record.document_type,
        });
        function.invoke(&payload).await.map(|_| ())
    }
}
