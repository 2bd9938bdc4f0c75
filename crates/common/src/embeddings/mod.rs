//! Embedding service abstraction
//!
//! Provides a unified interface for multiple embedding providers:
//! - OpenAI-compatible APIs (text-embedding-3-small, text-embedding-3-large)
//! - Text Embeddings Inference servers for open models (bge-m3, bge, nomic)
//! - A deterministic offline hash embedder for tests and dry runs
//!
//! Providers are resolved by model name through [`registry`].

pub mod openai;
pub mod registry;
pub mod tei;

use crate::config::EmbeddingConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use rand::{rngs::StdRng, Rng, SeedableRng};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::info;

pub use openai::OpenAIEmbedder;
pub use registry::{ModelSpec, ProviderKind};
pub use tei::TeiEmbedder;

/// Trait for embedding generation
///
/// Implementations are order-preserving: output row `i` belongs to input
/// text `i`. Identical input text yields identical vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;
}

/// Deterministic offline embedder
///
/// Each text is hashed with SHA-256 and the digest seeds a PRNG that draws
/// the vector components, so equal texts map to equal vectors and distinct
/// texts map to (almost surely) distinct directions.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&Sha256::digest(text.as_bytes()));
        let mut rng = StdRng::from_seed(seed);
        (0..self.dimension).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector_for(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn model_name(&self) -> &str {
        "hash"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Create the embedder configured in `config.model`
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    create_embedder_for(&config.model, config)
}

/// Create an embedder for a registry model name.
///
/// Unknown names fail with `ModelNotFound`; hosted providers without an API
/// key fail with a configuration error.
pub fn create_embedder_for(model: &str, config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    let spec = registry::lookup(model).ok_or_else(|| AppError::ModelNotFound {
        model: model.to_string(),
    })?;

    let embedder: Arc<dyn Embedder> = match spec.provider {
        ProviderKind::OpenAI => {
            let key = config.api_key.clone().ok_or_else(|| AppError::Configuration {
                message: format!("API key required for embedding model {}", spec.name),
            })?;
            Arc::new(OpenAIEmbedder::new(key, spec, config)?)
        }
        ProviderKind::Tei => Arc::new(TeiEmbedder::new(spec, config)?),
        ProviderKind::Hash => Arc::new(HashEmbedder::new(config.dimension)),
    };

    info!(
        model = embedder.model_name(),
        provider = ?spec.provider,
        dimension = embedder.dimension(),
        "Embedding model ready"
    );

    Ok(embedder)
}

/// Check that a provider returned exactly one row per input
pub(crate) fn ensure_row_count(expected: usize, rows: &[Vec<f32>]) -> Result<()> {
    if rows.len() != expected {
        return Err(AppError::LengthMismatch {
            what: "embedding rows",
            expected,
            actual: rows.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_embedder_is_deterministic() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.embed("quantum computing").await.unwrap();
        let b = embedder.embed("quantum computing").await.unwrap();
        let c = embedder.embed("classical mechanics").await.unwrap();

        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn test_hash_batch_matches_single() {
        let embedder = HashEmbedder::new(32);
        let texts = vec!["text1".to_string(), "text2".to_string()];
        let batch = embedder.embed_batch(&texts).await.unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], embedder.embed("text1").await.unwrap());
        assert_eq!(batch[1], embedder.embed("text2").await.unwrap());
    }

    #[test]
    fn test_unknown_model_is_not_found() {
        let config = EmbeddingConfig::default();
        let err = create_embedder_for("no-such-model", &config).err().unwrap();
        assert!(matches!(err, AppError::ModelNotFound { ref model } if model == "no-such-model"));
    }

    #[test]
    fn test_hosted_model_requires_api_key() {
        let config = EmbeddingConfig::default();
        let err = create_embedder_for("text-embedding-3-small", &config).err().unwrap();
        assert!(matches!(err, AppError::Configuration { .. }));
    }

    #[test]
    fn test_hash_model_uses_configured_dimension() {
        let config = EmbeddingConfig {
            model: "hash".to_string(),
            dimension: 16,
            ..EmbeddingConfig::default()
        };
        let embedder = create_embedder(&config).unwrap();
        assert_eq!(embedder.dimension(), 16);
        assert_eq!(embedder.model_name(), "hash");
    }

    #[test]
    fn test_default_model_resolves_to_tei() {
        let embedder = create_embedder(&EmbeddingConfig::default()).unwrap();
        assert_eq!(embedder.model_name(), "bge-m3");
        assert_eq!(embedder.dimension(), 1024);
    }

    #[test]
    fn test_row_count_check() {
        let rows = vec![vec![0.0f32; 4]];
        assert!(ensure_row_count(1, &rows).is_ok());
        assert!(matches!(
            ensure_row_count(2, &rows),
            Err(AppError::LengthMismatch { expected: 2, actual: 1, .. })
        ));
    }
}
