//! TOML-based configuration for the relay
//!
//! Everything the relay needs at start-up is declared in a single TOML file
//! (`relay.toml` by default): server binding and logging, the completion
//! provider, the embedding provider and vector index used for retrieval,
//! and the retrieval / ingestion parameters.
//!
//! Secrets are never written into the file. Provider sections name the
//! environment variable that holds the credential (`api_key_env`), and the
//! value is resolved when the client is built.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure loaded from relay.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub assistant: AssistantConfig,

    #[serde(default)]
    pub completion: CompletionConfig,

    /// Embedding provider, required when retrieval is enabled
    #[serde(default)]
    pub embedding: Option<EmbeddingConfig>,

    /// Vector index, required when retrieval is enabled
    #[serde(default)]
    pub vector_index: Option<VectorIndexConfig>,

    #[serde(default)]
    pub rag: RagConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            assistant: AssistantConfig::default(),
            completion: CompletionConfig::default(),
            embedding: Some(EmbeddingConfig::default()),
            vector_index: Some(VectorIndexConfig::default()),
            rag: RagConfig::default(),
        }
    }
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Upper bound for a chat request body (the whole conversation)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

// ============= Assistant Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Fixed system message prepended to every prompt
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// First assistant message shown by chat clients
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

fn default_system_prompt() -> String {
    "You are an expert stock market assistant. Answer any questions about stock market provided. \
     You always answer questions based only on the context that you have been provided."
        .to_string()
}

fn default_greeting() -> String {
    "Hi! I'm the Headstarter support assistant. How can I help you today?".to_string()
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            greeting: default_greeting(),
        }
    }
}

// ============= Completion Provider Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Deadline for the whole completion stream, first fragment included
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub provider: ProviderConfig,
}

fn default_completion_timeout() -> u64 {
    120
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_completion_timeout(),
            provider: ProviderConfig::default(),
        }
    }
}

impl CompletionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    OpenAI {
        /// Environment variable containing API key
        #[serde(default = "default_openai_key_env")]
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
        #[serde(default = "default_chat_model")]
        model: String,
    },
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        model: String,
    },
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::OpenAI {
            api_key_env: default_openai_key_env(),
            api_base: default_openai_base(),
            model: default_chat_model(),
        }
    }
}

impl ProviderConfig {
    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::OpenAI { model, .. } | ProviderConfig::Ollama { model, .. } => model,
        }
    }
}

// ============= Embedding Provider Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EmbeddingConfig {
    OpenAI {
        #[serde(default = "default_openai_key_env")]
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
        #[serde(default = "default_embedding_model")]
        model: String,
    },
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        #[serde(default = "default_ollama_embedding_model")]
        model: String,
    },
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_ollama_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        EmbeddingConfig::OpenAI {
            api_key_env: default_openai_key_env(),
            api_base: default_openai_base(),
            model: default_embedding_model(),
        }
    }
}

// ============= Vector Index Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VectorIndexConfig {
    Pinecone {
        #[serde(default = "default_pinecone_key_env")]
        api_key_env: String,
        #[serde(default = "default_index_name")]
        index_name: String,
        /// Data-plane host; looked up through the control plane when absent
        #[serde(default)]
        host: Option<String>,
        #[serde(default)]
        namespace: Option<String>,
        #[serde(default = "default_control_plane_url")]
        control_plane_url: String,
    },
    /// Process-local cosine index; contents are lost on exit
    Memory,
}

fn default_pinecone_key_env() -> String {
    "PINECONE_API_KEY".to_string()
}

fn default_index_name() -> String {
    "openaichatbot".to_string()
}

fn default_control_plane_url() -> String {
    "https://api.pinecone.io".to_string()
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        VectorIndexConfig::Pinecone {
            api_key_env: default_pinecone_key_env(),
            index_name: default_index_name(),
            host: None,
            namespace: None,
            control_plane_url: default_control_plane_url(),
        }
    }
}

// ============= RAG Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Augment every prompt with retrieved context
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Chunk size in tokens of `encoding`
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// tiktoken encoding used to measure chunk length
    #[serde(default = "default_encoding")]
    pub encoding: String,

    /// Deadline for query embedding plus index query
    #[serde(default = "default_retrieval_timeout")]
    pub retrieval_timeout_secs: u64,

    /// Fail the request when the index returns no matches
    #[serde(default)]
    pub require_context: bool,

    /// Documents ingested by `ingest` without arguments and on start-up
    #[serde(default)]
    pub documents: Vec<PathBuf>,

    #[serde(default)]
    pub ingest_on_startup: bool,

    #[serde(default = "default_batch_size")]
    pub embed_batch_size: usize,

    #[serde(default = "default_batch_size")]
    pub upsert_batch_size: usize,
}

fn default_true() -> bool {
    true
}

fn default_top_k() -> usize {
    5
}

fn default_chunk_size() -> usize {
    2000
}

fn default_chunk_overlap() -> usize {
    100
}

fn default_encoding() -> String {
    "p50k_base".to_string()
}

fn default_retrieval_timeout() -> u64 {
    30
}

fn default_batch_size() -> usize {
    100
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            top_k: default_top_k(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            encoding: default_encoding(),
            retrieval_timeout_secs: default_retrieval_timeout(),
            require_context: false,
            documents: Vec::new(),
            ingest_on_startup: false,
            embed_batch_size: default_batch_size(),
            upsert_batch_size: default_batch_size(),
        }
    }
}

impl RagConfig {
    pub fn retrieval_timeout(&self) -> Duration {
        Duration::from_secs(self.retrieval_timeout_secs)
    }
}

/// tiktoken encodings accepted by `rag.encoding`
pub const SUPPORTED_ENCODINGS: &[&str] = &["p50k_base", "r50k_base", "cl100k_base", "o200k_base"];

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl RelayConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse_str(&content)
    }

    /// Load configuration without validating it.
    ///
    /// Used by commands that only read a few settings and must not require
    /// every referenced credential to be present.
    pub fn load_unchecked<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        let config: RelayConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate value ranges and the presence of referenced env vars
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.completion.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "completion.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if let ProviderConfig::OpenAI { api_key_env, .. } = &self.completion.provider {
            self.validate_env_var(api_key_env)?;
        }

        let rag = &self.rag;
        if rag.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "rag.chunk_size must be greater than 0".to_string(),
            ));
        }
        if rag.chunk_overlap >= rag.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                rag.chunk_overlap, rag.chunk_size
            )));
        }
        if rag.embed_batch_size == 0 || rag.upsert_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "rag batch sizes must be greater than 0".to_string(),
            ));
        }
        if !SUPPORTED_ENCODINGS.contains(&rag.encoding.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Unsupported rag.encoding '{}' (expected one of: {})",
                rag.encoding,
                SUPPORTED_ENCODINGS.join(", ")
            )));
        }

        if rag.enabled {
            if rag.top_k == 0 {
                return Err(ConfigError::ValidationError(
                    "rag.top_k must be greater than 0".to_string(),
                ));
            }
            if rag.retrieval_timeout_secs == 0 {
                return Err(ConfigError::ValidationError(
                    "rag.retrieval_timeout_secs must be greater than 0".to_string(),
                ));
            }

            match &self.embedding {
                Some(EmbeddingConfig::OpenAI { api_key_env, .. }) => {
                    self.validate_env_var(api_key_env)?;
                }
                Some(EmbeddingConfig::Ollama { .. }) => {}
                None => {
                    return Err(ConfigError::ValidationError(
                        "rag.enabled requires an [embedding] section".to_string(),
                    ));
                }
            }

            match &self.vector_index {
                Some(VectorIndexConfig::Pinecone { api_key_env, .. }) => {
                    self.validate_env_var(api_key_env)?;
                }
                Some(VectorIndexConfig::Memory) => {}
                None => {
                    return Err(ConfigError::ValidationError(
                        "rag.enabled requires a [vector_index] section".to_string(),
                    ));
                }
            }
        }

        if rag.ingest_on_startup && rag.documents.is_empty() {
            return Err(ConfigError::ValidationError(
                "rag.ingest_on_startup is set but rag.documents is empty".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
        Ok(())
    }

    /// Get a resolved value from an env var reference
    pub fn resolve_env(env_name: &str) -> Result<String, ConfigError> {
        std::env::var(env_name).map_err(|_| ConfigError::MissingEnvVar(env_name.to_string()))
    }

    /// Socket address string the server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
