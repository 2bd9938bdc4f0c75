//! Configuration management for PaperRank
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Embedding model configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// LLM client configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Reranking pipeline configuration
    #[serde(default)]
    pub rerank: RerankConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Registry name of the embedding model (bge-m3, text-embedding-3-small, hash)
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// API key for hosted embedding services
    pub api_key: Option<String>,

    /// API base URL (OpenAI-compatible or TEI server)
    pub api_base: Option<String>,

    /// Dimension used by the offline hash embedder
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Texts per embedding request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// API key; when absent the local inference backend is used
    pub api_key: Option<String>,

    /// Hosted API base URL
    #[serde(default = "default_llm_api_base")]
    pub api_base: String,

    /// Model name; the local backend falls back to its default model
    pub model: Option<String>,

    /// Local completion server URL
    #[serde(default = "default_local_endpoint")]
    pub local_endpoint: String,

    /// Language generated text should be written in
    #[serde(default = "default_lang")]
    pub lang: String,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Attempts against the hosted API before giving up
    #[serde(default = "default_llm_attempts")]
    pub max_attempts: u32,

    /// Fixed pause between hosted API attempts
    #[serde(default = "default_llm_retry_delay")]
    pub retry_delay_secs: u64,

    /// Token limit for local generation
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: usize,
}

/// How zero-norm embeddings are handled during normalization
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ZeroVectorPolicy {
    /// Fail the rerank call
    #[default]
    Reject,
    /// Keep the row at zero so every similarity against it is 0
    ZeroSimilarity,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RerankConfig {
    /// JSON file with the reference corpus (Zotero items or flat records)
    #[serde(default = "default_corpus_path")]
    pub corpus_path: String,

    /// JSON file with candidate papers
    #[serde(default = "default_candidates_path")]
    pub candidates_path: String,

    /// Output path; stdout when unset
    pub output_path: Option<String>,

    /// Zero-norm embedding handling
    #[serde(default)]
    pub zero_vector_policy: ZeroVectorPolicy,

    /// Number of top papers to summarize with the LLM (0 disables)
    #[serde(default)]
    pub tldr_top_k: usize,

    /// Summary characters sent to the LLM per paper
    #[serde(default = "default_tldr_max_chars")]
    pub tldr_max_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error) or a full EnvFilter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_embedding_model() -> String { crate::DEFAULT_EMBEDDING_MODEL.to_string() }
fn default_embedding_dimension() -> usize { crate::DEFAULT_EMBEDDING_DIMENSION }
fn default_embedding_timeout() -> u64 { 60 }
fn default_batch_size() -> usize { 64 }
fn default_llm_api_base() -> String { "https://api.openai.com/v1".to_string() }
fn default_local_endpoint() -> String { "http://127.0.0.1:8081".to_string() }
fn default_lang() -> String { "English".to_string() }
fn default_llm_timeout() -> u64 { 120 }
fn default_llm_attempts() -> u32 { 3 }
fn default_llm_retry_delay() -> u64 { 3 }
fn default_llm_max_tokens() -> usize { 2048 }
fn default_corpus_path() -> String { "corpus.json".to_string() }
fn default_candidates_path() -> String { "candidates.json".to_string() }
fn default_tldr_max_chars() -> usize { 4000 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { false }
fn default_service_name() -> String { "paperrank".to_string() }

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            api_key: None,
            api_base: None,
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_llm_api_base(),
            model: None,
            local_endpoint: default_local_endpoint(),
            lang: default_lang(),
            timeout_secs: default_llm_timeout(),
            max_attempts: default_llm_attempts(),
            retry_delay_secs: default_llm_retry_delay(),
            max_tokens: default_llm_max_tokens(),
        }
    }
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            corpus_path: default_corpus_path(),
            candidates_path: default_candidates_path(),
            output_path: None,
            zero_vector_policy: ZeroVectorPolicy::default(),
            tldr_top_k: 0,
            tldr_max_chars: default_tldr_max_chars(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__EMBEDDING__MODEL=bge-m3
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }
}

impl EmbeddingConfig {
    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl LlmConfig {
    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the pause between hosted API attempts as Duration
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}
