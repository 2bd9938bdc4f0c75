//! OpenAI-compatible embedding client

use super::{ensure_row_count, Embedder, ModelSpec};
use crate::config::EmbeddingConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// OpenAI embedding client
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimension: usize,
    base_url: String,
    batch_size: usize,
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    data: Vec<OpenAIEmbedding>,
}

#[derive(Deserialize)]
struct OpenAIEmbedding {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder for a registry model
    pub fn new(api_key: String, spec: &ModelSpec, config: &EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            model: spec.name.to_string(),
            dimension: spec.dimension,
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            batch_size: config.batch_size.max(1),
        })
    }

    #[instrument(skip(self, texts), fields(model = %self.model, count = texts.len()))]
    async fn make_request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let _timer = metrics::Timer::start(metrics::EMBEDDING_DURATION).with_label("model", self.model.clone());
        metrics::record_embedding_request(&self.model, texts.len());

        let request = OpenAIRequest {
            input: texts,
            model: &self.model,
        };

        let response = self.client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                metrics::record_embedding_error(&self.model);
                AppError::EmbeddingError {
                    message: format!("Request failed: {}", e),
                }
            })?;

        if !response.status().is_success() {
            metrics::record_embedding_error(&self.model);
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::EmbeddingError {
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: OpenAIResponse = response.json().await.map_err(|e| {
            AppError::EmbeddingError {
                message: format!("Failed to parse response: {}", e),
            }
        })?;

        Ok(order_by_index(result.data))
    }
}

/// The API may return rows out of order; `index` is authoritative
fn order_by_index(mut data: Vec<OpenAIEmbedding>) -> Vec<Vec<f32>> {
    data.sort_by_key(|e| e.index);
    data.into_iter().map(|e| e.embedding).collect()
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.make_request(&[text.to_string()]).await?;
        embeddings.into_iter().next().ok_or_else(|| AppError::EmbeddingError {
            message: "Empty response".to_string(),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.batch_size) {
            let embeddings = self.make_request(chunk).await?;
            ensure_row_count(chunk.len(), &embeddings)?;
            all_embeddings.extend(embeddings);
        }

        debug!(model = %self.model, rows = all_embeddings.len(), "Embedded batch");
        Ok(all_embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::registry;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    /// Embeds `text-i` as `[i, 1]` and lists the rows in reverse
    struct ReversedRows;

    impl Respond for ReversedRows {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
            let data: Vec<serde_json::Value> = body["input"]
                .as_array()
                .unwrap()
                .iter()
                .enumerate()
                .map(|(index, t)| {
                    let i: f32 = t.as_str().unwrap().trim_start_matches("text-").parse().unwrap();
                    serde_json::json!({"index": index, "embedding": [i, 1.0]})
                })
                .rev()
                .collect();

            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": data }))
        }
    }

    #[test]
    fn test_response_rows_ordered_by_index() {
        let body = r#"{"data": [
            {"index": 1, "embedding": [0.0, 1.0]},
            {"index": 0, "embedding": [1.0, 0.0]}
        ]}"#;
        let parsed: OpenAIResponse = serde_json::from_str(body).unwrap();
        let rows = order_by_index(parsed.data);
        assert_eq!(rows, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_request_body_shape() {
        let input = vec!["a".to_string(), "b".to_string()];
        let request = OpenAIRequest {
            input: &input,
            model: "text-embedding-3-small",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "text-embedding-3-small");
        assert_eq!(json["input"][1], "b");
    }

    #[test]
    fn test_new_uses_spec_and_config() {
        let spec = registry::lookup("text-embedding-3-large").unwrap();
        let config = EmbeddingConfig {
            api_base: Some("http://localhost:9999/v1/".to_string()),
            batch_size: 0,
            ..EmbeddingConfig::default()
        };
        let embedder = OpenAIEmbedder::new("key".to_string(), spec, &config).unwrap();
        assert_eq!(embedder.dimension(), 3072);
        assert_eq!(embedder.model_name(), "text-embedding-3-large");
        assert_eq!(embedder.batch_size, 1);
    }

    #[tokio::test]
    async fn test_chunked_batch_rows_follow_input_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("Authorization", "Bearer sk-test"))
            .respond_with(ReversedRows)
            .expect(3)
            .mount(&server)
            .await;

        let spec = registry::lookup("text-embedding-3-small").unwrap();
        let config = EmbeddingConfig {
            api_base: Some(format!("{}/v1", server.uri())),
            batch_size: 2,
            timeout_secs: 5,
            ..EmbeddingConfig::default()
        };
        let embedder = OpenAIEmbedder::new("sk-test".to_string(), spec, &config).unwrap();

        let texts: Vec<String> = (0..5).map(|i| format!("text-{i}")).collect();
        let rows = embedder.embed_batch(&texts).await.unwrap();

        assert_eq!(rows.len(), 5);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row, &vec![i as f32, 1.0], "row {i}");
        }
    }
}
