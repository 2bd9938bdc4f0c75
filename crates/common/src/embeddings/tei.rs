//! Text Embeddings Inference client
//!
//! Serves open embedding models (bge-m3 and friends) from a local or remote
//! TEI server. The server is asked for raw vectors; normalization happens in
//! the reranker so zero-norm rows can be detected there.

use super::{ensure_row_count, Embedder, ModelSpec};
use crate::config::EmbeddingConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use tracing::{debug, instrument};

/// Default TEI server address
pub const DEFAULT_TEI_URL: &str = "http://127.0.0.1:8080";

/// Batches in flight at once; results are reassembled in input order
const MAX_CONCURRENT_BATCHES: usize = 4;

/// TEI embedding client
pub struct TeiEmbedder {
    client: reqwest::Client,
    model: String,
    dimension: usize,
    base_url: String,
    batch_size: usize,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [String],
    normalize: bool,
    truncate: bool,
}

impl TeiEmbedder {
    pub fn new(spec: &ModelSpec, config: &EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            model: spec.name.to_string(),
            dimension: spec.dimension,
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_TEI_URL.to_string()),
            batch_size: config.batch_size.max(1),
        })
    }

    #[instrument(skip(self, texts), fields(model = %self.model, count = texts.len()))]
    async fn make_request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embed", self.base_url.trim_end_matches('/'));
        let _timer = metrics::Timer::start(metrics::EMBEDDING_DURATION).with_label("model", self.model.clone());
        metrics::record_embedding_request(&self.model, texts.len());

        let request = EmbedRequest {
            inputs: texts,
            normalize: false,
            truncate: true,
        };

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                metrics::record_embedding_error(&self.model);
                AppError::EmbeddingError {
                    message: format!("TEI request to {} failed: {}", url, e),
                }
            })?;

        if !response.status().is_success() {
            metrics::record_embedding_error(&self.model);
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::EmbeddingError {
                message: format!("TEI error {}: {}", status, body),
            });
        }

        response.json::<Vec<Vec<f32>>>().await.map_err(|e| AppError::EmbeddingError {
            message: format!("Failed to parse TEI response: {}", e),
        })
    }
}

#[async_trait]
impl Embedder for TeiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.make_request(&[text.to_string()]).await?;
        embeddings.into_iter().next().ok_or_else(|| AppError::EmbeddingError {
            message: "Empty response".to_string(),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let batches: Vec<Vec<Vec<f32>>> = stream::iter(texts.chunks(self.batch_size))
            .map(|chunk| async move {
                let embeddings = self.make_request(chunk).await?;
                ensure_row_count(chunk.len(), &embeddings)?;
                Ok::<_, AppError>(embeddings)
            })
            .buffered(MAX_CONCURRENT_BATCHES)
            .boxed()
            .try_collect()
            .await?;

        let all_embeddings: Vec<Vec<f32>> = batches.into_iter().flatten().collect();
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
