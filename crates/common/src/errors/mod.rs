//! Error types for PaperRank
//!
//! Provides a single error enum for the recommender with:
//! - Distinct variants for input validation, degenerate data and upstream failures
//! - Machine-readable error codes
//! - Input/upstream classification for logging

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Input validation errors (1xxx)
    ValidationError,
    EmptyCorpus,
    InvalidTimestamp,
    LengthMismatch,
    DimensionMismatch,

    // Degenerate data (2xxx)
    DegenerateVector,

    // Model resolution (3xxx)
    ModelNotFound,

    // External service errors (8xxx)
    UpstreamError,
    EmbeddingError,
    UpstreamUnavailable,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
    IoError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::EmptyCorpus => 1002,
            ErrorCode::InvalidTimestamp => 1003,
            ErrorCode::LengthMismatch => 1004,
            ErrorCode::DimensionMismatch => 1005,

            // Degenerate (2xxx)
            ErrorCode::DegenerateVector => 2001,

            // Models (3xxx)
            ErrorCode::ModelNotFound => 3001,

            // External (8xxx)
            ErrorCode::UpstreamError => 8001,
            ErrorCode::EmbeddingError => 8002,
            ErrorCode::UpstreamUnavailable => 8003,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
            ErrorCode::IoError => 9004,
        }
    }
}

/// Which side of the similarity matrix a vector came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VectorSide {
    Corpus,
    Candidate,
}

impl std::fmt::Display for VectorSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorSide::Corpus => write!(f, "corpus"),
            VectorSide::Candidate => write!(f, "candidate"),
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Input validation errors
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Corpus is empty: at least one reference paper is required")]
    EmptyCorpus,

    #[error("Invalid timestamp {value:?} at corpus index {index}: expected YYYY-MM-DDTHH:MM:SSZ")]
    InvalidTimestamp { index: usize, value: String },

    #[error("Length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Embedding dimension mismatch at row {row}: expected {expected}, got {actual}")]
    DimensionMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    // Degenerate data
    #[error("Zero-norm embedding for {side} at index {index}")]
    DegenerateVector { side: VectorSide, index: usize },

    // Model resolution
    #[error("Embedding model not found: {model}")]
    ModelNotFound { model: String },

    // External service errors
    #[error("Embedding service error: {message}")]
    EmbeddingError { message: String },

    #[error("{service} unavailable after {attempts} attempts: {message}")]
    UpstreamUnavailable {
        service: String,
        attempts: u32,
        message: String,
    },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::EmptyCorpus => ErrorCode::EmptyCorpus,
            AppError::InvalidTimestamp { .. } => ErrorCode::InvalidTimestamp,
            AppError::LengthMismatch { .. } => ErrorCode::LengthMismatch,
            AppError::DimensionMismatch { .. } => ErrorCode::DimensionMismatch,
            AppError::DegenerateVector { .. } => ErrorCode::DegenerateVector,
            AppError::ModelNotFound { .. } => ErrorCode::ModelNotFound,
            AppError::EmbeddingError { .. } => ErrorCode::EmbeddingError,
            AppError::UpstreamUnavailable { .. } => ErrorCode::UpstreamUnavailable,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Io(_) => ErrorCode::IoError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Input errors are caused by caller data and never succeed on retry
    pub fn is_input_error(&self) -> bool {
        matches!(self.code().as_code(), 1000..=2999)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::InvalidTimestamp {
            index: 3,
            value: "2024-01-01".into(),
        };
        assert_eq!(err.code(), ErrorCode::InvalidTimestamp);
        assert_eq!(err.code().as_code(), 1003);
        assert!(err.is_input_error());
    }

    #[test]
    fn test_degenerate_vector_message() {
        let err = AppError::DegenerateVector {
            side: VectorSide::Candidate,
            index: 2,
        };
        assert_eq!(err.to_string(), "Zero-norm embedding for candidate at index 2");
        assert!(err.is_input_error());
    }

    #[test]
    fn test_upstream_error() {
        let err = AppError::UpstreamUnavailable {
            service: "llm".into(),
            attempts: 3,
            message: "connection refused".into(),
        };
        assert_eq!(err.code().as_code(), 8003);
        assert!(!err.is_input_error());
        assert!(err.to_string().contains("after 3 attempts"));
    }

    #[test]
    fn test_model_not_found() {
        let err = AppError::ModelNotFound { model: "nope".into() };
        assert!(!err.is_input_error());
        assert_eq!(err.code(), ErrorCode::ModelNotFound);
    }
}
