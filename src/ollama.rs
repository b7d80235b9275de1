//! # Ollama Client
//!
//! [`InferenceBackend`] over a local Ollama server's `/api/generate`
//! endpoint, non-streaming.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::InferenceConfig;
use crate::errors::InferenceError;
use crate::inference::InferenceBackend;

/// Sampling options sent with every request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub num_predict: u32,
    pub stop: Vec<String>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: &'a GenerateOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct OllamaClient {
    base_url: String,
    model: String,
    options: GenerateOptions,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, options: GenerateOptions) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            options,
            client: reqwest::Client::new(),
        }
    }

    /// Client with sampling options and request timeout from configuration
    pub fn from_config(config: &InferenceConfig) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.recovery.operation_timeout_secs))
            .build()?;
        let options = GenerateOptions {
            temperature: config.temperature,
            top_p: config.top_p,
            num_predict: config.num_predict,
            stop: config.stop.clone(),
        };
        Ok(Self {
            client,
            ..Self::new(config.base_url.as_str(), config.model.as_str(), options)
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

#[async_trait]
impl InferenceBackend for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, InferenceError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: &self.options,
        };
        let response = self.client.post(self.endpoint()).json(&request).send().await?;
        let status = response.status();
        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::MalformedResponse(e.to_string()))?;

        if !status.is_success() {
            return Err(InferenceError::Service {
                status: status.as_u16(),
                message: body.error.unwrap_or_else(|| "unknown service error".to_string()),
            });
        }

        let text = body
            .response
            .ok_or_else(|| InferenceError::MalformedResponse("missing 'response' field".to_string()))?;
        trace!("Model {} answered: {}", self.model, text);
        Ok(text.trim().to_string())
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
