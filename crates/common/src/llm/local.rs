//! Local inference backend
//!
//! Messages are rendered with the model's chat template and sent as a raw
//! prompt to a llama.cpp-compatible completion server running next to the
//! process. Streaming is off; the reply arrives in one response.

use super::template::{render_chatml, CHATML_STOP};
use super::{ChatBackend, ChatMessage};
use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Model used when the configuration does not name one
pub const DEFAULT_LOCAL_MODEL: &str = "Qwen2.5-7B-Instruct";

#[derive(Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    n_predict: usize,
    temperature: f32,
    stream: bool,
    stop: [&'static str; 1],
}

#[derive(Deserialize)]
struct CompletionResponse {
    content: String,
}

/// Local completion-server backend
pub struct LocalBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    max_tokens: usize,
}

impl LocalBackend {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string());
        info!(model = %model, endpoint = %config.local_endpoint, "Using local inference model");

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/completion", config.local_endpoint.trim_end_matches('/')),
            model,
            max_tokens: config.max_tokens,
        })
    }

    fn prompt(&self, messages: &[ChatMessage]) -> String {
        render_chatml(messages, true)
    }

    fn unavailable(&self, message: String) -> AppError {
        AppError::UpstreamUnavailable {
            service: format!("local model ({})", self.model),
            attempts: 1,
            message,
        }
    }
}

#[async_trait]
impl ChatBackend for LocalBackend {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        let prompt = self.prompt(messages);
        let request = CompletionRequest {
            prompt: &prompt,
            n_predict: self.max_tokens,
            temperature: 0.0,
            stream: false,
            stop: [CHATML_STOP],
        };

        let response = self.client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(self.unavailable(format!("status {}: {}", status, body)));
        }

        let completion: CompletionResponse = response.json().await?;
        debug!(model = %self.model, chars = completion.content.len(), "Local generation finished");
        Ok(completion.content.trim().to_string())
    }

    fn kind(&self) -> &'static str {
        "local"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
