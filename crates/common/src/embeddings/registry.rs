//! Embedding model registry
//!
//! Maps the model names accepted in configuration to the provider that
//! serves them and the dimension they produce.

/// Backend that serves a model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// OpenAI-compatible `/embeddings` API
    OpenAI,
    /// Text Embeddings Inference server (`/embed`)
    Tei,
    /// Offline deterministic hash embedder
    Hash,
}

/// Registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: &'static str,
    pub provider: ProviderKind,
    /// Output dimension; 0 means taken from configuration
    pub dimension: usize,
}

const fn spec(name: &'static str, provider: ProviderKind, dimension: usize) -> ModelSpec {
    ModelSpec {
        name,
        provider,
        dimension,
    }
}

/// Built-in models
pub const KNOWN_MODELS: &[ModelSpec] = &[
    spec("bge-m3", ProviderKind::Tei, 1024),
    spec("bge-large-en-v1.5", ProviderKind::Tei, 1024),
    spec("bge-base-en-v1.5", ProviderKind::Tei, 768),
    spec("bge-small-en-v1.5", ProviderKind::Tei, 384),
    spec("nomic-embed-text-v1.5", ProviderKind::Tei, 768),
    spec("all-minilm-l6-v2", ProviderKind::Tei, 384),
    spec("text-embedding-3-small", ProviderKind::OpenAI, 1536),
    spec("text-embedding-3-large", ProviderKind::OpenAI, 3072),
    spec("text-embedding-ada-002", ProviderKind::OpenAI, 1536),
    spec("hash", ProviderKind::Hash, 0),
];

/// Look up a model by name (case-insensitive, `BAAI/` org prefix allowed)
pub fn lookup(name: &str) -> Option<&'static ModelSpec> {
    let name = name.trim();
    let name = name
        .strip_prefix("BAAI/")
        .or_else(|| name.strip_prefix("baai/"))
        .unwrap_or(name);
    KNOWN_MODELS
        .iter()
        .find(|m| m.name.eq_ignore_ascii_case(name))
}
