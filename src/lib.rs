//! # Relay - Streaming Retrieval-Augmented Chat Relay
//!
//! A small chat backend: the browser posts the conversation so far, the relay
//! optionally looks up relevant document chunks in a vector index, prompts a
//! hosted language model and streams the reply back as it is generated.
//!
//! ## Overview
//!
//! Relay can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `relay-server` binary
//! 2. **As a library** - Build an [`AppState`] and mount [`api::routes::create_router`]
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use relay::{AppState, RelayConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = RelayConfig::load("relay.toml")?;
//!     let state = AppState::from_config(config).await?;
//!     let app = relay::api::routes::create_router(state);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `openai` | OpenAI chat completions and embeddings (default) |
//! | `ollama` | Ollama chat and embeddings (default) |
//! | `pinecone` | Pinecone vector index (default) |
//!
//! ## Modules
//!
//! - [`api`] - HTTP handlers and routes
//! - [`client`] - Streaming chat client and incremental UTF-8 decoding
//! - [`db`] - Vector index abstraction (Pinecone, in-memory)
//! - [`llm`] - Streaming completion providers
//! - [`rag`] - Chunking, embeddings, ingestion and retrieval
//! - [`relay`] - Prompt assembly and the streaming relay
//! - [`types`] - Common types and error handling
//! - [`utils`] - Configuration and HTTP helpers

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
pub mod api;
/// Command-line interface.
pub mod cli;
/// Streaming chat client.
pub mod client;
/// Vector index clients.
pub mod db;
/// LLM provider clients and abstractions.
pub mod llm;
/// Retrieval Augmented Generation (RAG) components.
pub mod rag;
/// The streaming chat relay.
pub mod relay;
/// Core types (messages, records, errors).
pub mod types;
/// Configuration and HTTP utilities.
pub mod utils;

// Re-export commonly used types
pub use db::{VectorIndex, VectorIndexProvider};
pub use llm::{FragmentStream, LLMClient, Provider};
pub use rag::{EmbeddingProvider, Ingestor, Retriever};
pub use relay::ChatRelay;
pub use types::{AppError, Message, Result, Role};
pub use utils::toml_config::RelayConfig;

use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Validated configuration loaded at start-up
    pub config: Arc<RelayConfig>,
    /// Completion client, optional retriever and system prompt
    pub relay: Arc<ChatRelay>,
}

impl AppState {
    /// Wrap an already-built relay.
    pub fn new(config: RelayConfig, relay: ChatRelay) -> Self {
        Self {
            config: Arc::new(config),
            relay: Arc::new(relay),
        }
    }

    /// Build every upstream client once from configuration.
    ///
    /// Retrieval is wired in only when `rag.enabled` is set.
    pub async fn from_config(config: RelayConfig) -> Result<Self> {
        let http = utils::http::http_client()?;

        let provider = Provider::from_config(&config.completion.provider)?;
        let llm = provider.create_client(http.clone())?;
        tracing::info!(provider = provider.name(), model = provider.model(), "Completion provider ready");

        let mut relay = ChatRelay::new(llm, config.assistant.system_prompt.clone())
            .with_completion_timeout(config.completion.timeout());

        if config.rag.enabled {
            let (embedder, index) = build_retrieval(&config, http).await?;
            tracing::info!(
                embedding_model = embedder.model_name(),
                index = index.provider_name(),
                top_k = config.rag.top_k,
                "Retrieval enabled"
            );
            relay = relay.with_retriever(Arc::new(Retriever::from_config(
                &config.rag,
                embedder,
                index,
            )));
        }

        Ok(Self::new(config, relay))
    }
}

/// Build the embedding provider and vector index named in configuration.
pub async fn build_retrieval(
    config: &RelayConfig,
    http: reqwest::Client,
) -> Result<(Arc<dyn EmbeddingProvider>, Arc<dyn VectorIndex>)> {
    let embedding = config.embedding.as_ref().ok_or_else(|| {
        AppError::Configuration("Retrieval requires an [embedding] section".to_string())
    })?;
    let vector_index = config.vector_index.as_ref().ok_or_else(|| {
        AppError::Configuration("Retrieval requires a [vector_index] section".to_string())
    })?;

    let embedder = rag::create_embedding_provider(embedding, http.clone())?;
    let index = VectorIndexProvider::from_config(vector_index)?
        .create_index(http)
        .await?;

    Ok((embedder, index))
}
