//! PaperRank Common Library
//!
//! Shared code for the PaperRank recommender including:
//! - Embedding provider abstraction and model registry
//! - LLM client (hosted API with retries, local inference fallback)
//! - Bounded retry policy
//! - Error types and handling
//! - Configuration management
//! - Metrics names

pub mod config;
pub mod embeddings;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod retry;

// Re-export commonly used types
pub use errors::{AppError, Result};
pub use config::AppConfig;
pub use embeddings::Embedder;
pub use llm::{ChatMessage, Llm, LlmHandle};
pub use retry::RetryPolicy;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "bge-m3";

/// Default embedding dimension (bge-m3)
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1024;
