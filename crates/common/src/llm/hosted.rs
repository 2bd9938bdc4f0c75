//! Hosted chat completion backend (OpenAI-compatible)

use super::{ChatBackend, ChatMessage};
use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Model used when the configuration does not name one
pub const DEFAULT_HOSTED_MODEL: &str = "gpt-4o-mini";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// Hosted API backend
///
/// Sampling is deterministic (temperature 0). Every failure is retried up to
/// the policy's attempt limit with a fixed pause; the last failure is
/// surfaced as `UpstreamUnavailable`.
pub struct HostedBackend {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    retry: RetryPolicy,
}

impl HostedBackend {
    pub fn new(api_key: &str, config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_HOSTED_MODEL.to_string()),
            retry: RetryPolicy::new(config.max_attempts, config.retry_delay()),
        })
    }

    /// Override the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn request<'a>(&'a self, messages: &'a [ChatMessage]) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages,
            temperature: 0.0,
        }
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let response = self.client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.request(messages))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Internal {
                message: format!("LLM API error {}: {}", status, body),
            });
        }

        let chat_response: ChatResponse = response.json().await?;
        first_choice(chat_response)
    }
}

fn first_choice(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| AppError::Internal {
            message: "Empty response from LLM".to_string(),
        })
}

#[async_trait]
impl ChatBackend for HostedBackend {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        let reply = self
            .retry
            .run("llm.chat_completion", || self.complete(messages))
            .await
            .map_err(|e| AppError::UpstreamUnavailable {
                service: format!("LLM API ({})", self.model),
                attempts: e.attempts,
                message: e.last_error.to_string(),
            })?;

        debug!(model = %self.model, chars = reply.len(), "LLM reply received");
        Ok(reply)
    }

    fn kind(&self) -> &'static str {
        "hosted"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> LlmConfig {
        LlmConfig {
            api_key: Some("sk-test".to_string()),
            api_base: "http://127.0.0.1:1/v1/".to_string(),
            timeout_secs: 2,
            ..LlmConfig::default()
        }
    }

    #[test]
    fn test_request_is_deterministic() {
        let backend = HostedBackend::new("sk-test", &config()).unwrap();
        let messages = vec![ChatMessage::user("hi")];
        let json = serde_json::to_value(backend.request(&messages)).unwrap();

        assert_eq!(json["temperature"], 0.0);
        assert_eq!(json["model"], DEFAULT_HOSTED_MODEL);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(backend.endpoint, "http://127.0.0.1:1/v1/chat/completions");
    }

    #[test]
    fn test_retry_policy_from_config() {
        let backend = HostedBackend::new("sk-test", &config()).unwrap();
        assert_eq!(backend.retry, RetryPolicy::new(3, Duration::from_secs(3)));
    }

    #[test]
    fn test_first_choice() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "TL;DR"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(first_choice(parsed).unwrap(), "TL;DR");

        let empty: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(first_choice(empty).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_api_fails_after_all_attempts() {
        let backend = HostedBackend::new("sk-test", &config())
            .unwrap()
            .with_retry(RetryPolicy::new(3, Duration::from_millis(1)));

        let err = backend
            .generate(&[ChatMessage::user("hi")])
            .await
            .unwrap_err();

        match err {
            AppError::UpstreamUnavailable { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "A short TL;DR."}}]
            })))
            .mount(&server)
            .await;

        let config = LlmConfig {
            api_base: format!("{}/v1", server.uri()),
            ..config()
        };
        let backend = HostedBackend::new("sk-test", &config)
            .unwrap()
            .with_retry(RetryPolicy::new(3, Duration::from_millis(1)));

        let reply = backend.generate(&[ChatMessage::user("summarize")]).await.unwrap();

        assert_eq!(reply, "A short TL;DR.");
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_persistent_server_errors_exhaust_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let config = LlmConfig {
            api_base: format!("{}/v1", server.uri()),
            ..config()
        };
        let backend = HostedBackend::new("sk-test", &config)
            .unwrap()
            .with_retry(RetryPolicy::new(3, Duration::from_millis(1)));

        let err = backend.generate(&[ChatMessage::user("summarize")]).await.unwrap_err();
        match err {
            AppError::UpstreamUnavailable { attempts, message, .. } => {
                assert_eq!(attempts, 3);
                assert!(message.contains("503"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
