//! LLM Client abstractions and provider management
//!
//! The relay only needs one capability from a language model: turn an
//! ordered list of role-tagged messages into a live stream of text deltas.
//! Providers:
//! - **OpenAI** (and compatible APIs): via `async-openai` chat streaming
//! - **Ollama**: via `ollama-rs` chat streaming

use crate::types::{AppError, Message, Result};
use crate::utils::toml_config::{ProviderConfig, RelayConfig};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;

/// Incremental completion output, one text delta per item, in emission order.
///
/// Dropping the stream releases the upstream connection.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Generic LLM client trait for provider abstraction
///
/// All completion providers implement this trait, so the relay can be
/// exercised with substitute clients in tests.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Start a streaming completion for the given prompt.
    ///
    /// Errors returned here happen before any fragment was produced
    /// (connection refused, non-2xx status). Errors after that arrive as
    /// `Err` items on the stream, after which the stream ends.
    async fn stream_chat(&self, messages: &[Message]) -> Result<FragmentStream>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Provider enum for runtime selection
///
/// | Provider | Client crate   | Feature  |
/// |----------|----------------|----------|
/// | OpenAI   | `async-openai` | `openai` |
/// | Ollama   | `ollama-rs`    | `ollama` |
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI API provider (including compatible APIs)
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::OpenAI {
    ///     api_key: "sk-...".to_string(),
    ///     api_base: "https://api.openai.com/v1".to_string(),
    ///     model: "gpt-4o".to_string(),
    /// };
    /// ```
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
    },

    /// Ollama local LLM provider
    Ollama { base_url: String, model: String },
}

impl Provider {
    /// Resolve a provider from configuration, reading credentials from the environment.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        match config {
            ProviderConfig::OpenAI {
                api_key_env,
                api_base,
                model,
            } => Ok(Provider::OpenAI {
                api_key: RelayConfig::resolve_env(api_key_env)
                    .map_err(|e| AppError::Configuration(e.to_string()))?,
                api_base: api_base.clone(),
                model: model.clone(),
            }),
            ProviderConfig::Ollama { base_url, model } => Ok(Provider::Ollama {
                base_url: base_url.clone(),
                model: model.clone(),
            }),
        }
    }

    /// Create a client instance for this provider
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the provider's feature is disabled
    /// or the HTTP client cannot be built.
    pub fn create_client(&self, http: reqwest::Client) -> Result<Arc<dyn LLMClient>> {
        match self {
            #[cfg(feature = "openai")]
            Provider::OpenAI {
                api_key,
                api_base,
                model,
            } => Ok(Arc::new(super::openai::OpenAIClient::new(
                http,
                api_key.clone(),
                api_base.clone(),
                model.clone(),
            ))),

            #[cfg(feature = "ollama")]
            Provider::Ollama { base_url, model } => Ok(Arc::new(
                super::ollama::OllamaClient::new(http, base_url.clone(), model.clone())?,
            )),

            #[allow(unreachable_patterns)]
            _ => {
                let _ = http;
                Err(AppError::Configuration(format!(
                    "{} provider not enabled. Check feature flags.",
                    self.name()
                )))
            }
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "OpenAI",
            Provider::Ollama { .. } => "Ollama",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Provider::OpenAI { model, .. } | Provider::Ollama { model, .. } => model,
        }
    }
}
