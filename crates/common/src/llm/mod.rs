//! LLM client
//!
//! Provides:
//! - A hosted backend for OpenAI-compatible chat APIs with bounded retries
//! - A local backend that renders a chat template and calls a completion server
//! - `LlmHandle`, a caller-owned lazily initialized client
//!
//! The backend is chosen when the client is built: an API key selects the
//! hosted API, otherwise generation runs against the local model.

mod hosted;
mod local;
pub mod template;

pub use hosted::HostedBackend;
pub use local::{LocalBackend, DEFAULT_LOCAL_MODEL};

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tracing::{info, instrument};

/// Message author
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One chat turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A text generation backend
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Generate the assistant reply for an ordered message list
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Backend kind, for logs
    fn kind(&self) -> &'static str;

    /// Model identifier
    fn model(&self) -> &str;
}

/// LLM client
pub struct Llm {
    backend: Box<dyn ChatBackend>,
    lang: String,
}

impl Llm {
    /// Build a client from configuration.
    ///
    /// With `api_key` set the hosted API is used, otherwise the local model.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let backend: Box<dyn ChatBackend> = match config.api_key.as_deref() {
            Some(key) if !key.is_empty() => Box::new(HostedBackend::new(key, config)?),
            _ => Box::new(LocalBackend::new(config)?),
        };

        info!(
            backend = backend.kind(),
            model = backend.model(),
            lang = %config.lang,
            "LLM client ready"
        );

        Ok(Self::with_backend(backend, config.lang.clone()))
    }

    /// Wrap an existing backend
    pub fn with_backend(backend: Box<dyn ChatBackend>, lang: impl Into<String>) -> Self {
        Self {
            backend,
            lang: lang.into(),
        }
    }

    /// Generate a reply
    #[instrument(skip(self, messages), fields(backend = self.backend.kind(), messages = messages.len()))]
    pub async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        if messages.is_empty() {
            return Err(AppError::Validation {
                message: "at least one chat message is required".to_string(),
            });
        }

        let _timer = metrics::Timer::start(metrics::LLM_DURATION).with_label("backend", self.backend.kind());
        ::metrics::counter!(metrics::LLM_REQUESTS, "backend" => self.backend.kind()).increment(1);

        self.backend.generate(messages).await
    }

    /// Language generated text should be written in
    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// Backend kind ("hosted" or "local")
    pub fn backend_kind(&self) -> &'static str {
        self.backend.kind()
    }

    /// Model identifier
    pub fn model(&self) -> &str {
        self.backend.model()
    }
}

/// Builds an `Llm` on first use
pub type LlmFactory = Box<dyn Fn() -> Result<Llm> + Send + Sync>;

/// Caller-owned LLM slot.
///
/// Holds at most one client. `get` returns the installed client or builds
/// one with the factory (default settings when none was given). `set`
/// replaces the client explicitly.
pub struct LlmHandle {
    slot: RwLock<Option<Arc<Llm>>>,
    factory: Option<LlmFactory>,
}

impl Default for LlmHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmHandle {
    /// Empty handle; first `get` builds a client with default settings
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
            factory: None,
        }
    }

    /// Empty handle with a custom factory
    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Llm> + Send + Sync + 'static,
    {
        Self {
            slot: RwLock::new(None),
            factory: Some(Box::new(factory)),
        }
    }

    /// Handle with a client already installed
    pub fn configured(llm: Llm) -> Self {
        Self {
            slot: RwLock::new(Some(Arc::new(llm))),
            factory: None,
        }
    }

    /// Install or replace the client
    pub fn set(&self, llm: Llm) -> Result<()> {
        let mut slot = self.slot.write().map_err(|_| poisoned())?;
        *slot = Some(Arc::new(llm));
        Ok(())
    }

    /// Whether a client is installed
    pub fn is_initialized(&self) -> bool {
        self.slot.read().map(|s| s.is_some()).unwrap_or(false)
    }

    /// Get the installed client, building it on first use
    pub fn get(&self) -> Result<Arc<Llm>> {
        if let Some(llm) = self.slot.read().map_err(|_| poisoned())?.as_ref() {
            return Ok(Arc::clone(llm));
        }

        let mut slot = self.slot.write().map_err(|_| poisoned())?;
        if let Some(llm) = slot.as_ref() {
            return Ok(Arc::clone(llm));
        }

        let llm = match &self.factory {
            Some(factory) => factory()?,
            None => {
                info!("No LLM configured, creating a default one. Use `LlmHandle::set` to install a custom one.");
                Llm::new(&LlmConfig::default())?
            }
        };

        let llm = Arc::new(llm);
        *slot = Some(Arc::clone(&llm));
        Ok(llm)
    }
}

fn poisoned() -> AppError {
    AppError::Internal {
        message: "LLM handle lock poisoned".to_string(),
    }
}
