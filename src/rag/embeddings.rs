//! Embedding providers.
//!
//! Text → fixed-length vector, delegated to a hosted model. Used in batch
//! during ingestion and once per chat request for the query.

use crate::types::{AppError, Result};
use crate::utils::http::join_url;
use crate::utils::toml_config::EmbeddingConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts, one vector per input in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| AppError::Upstream("Embedding provider returned no vector".to_string()))
    }

    fn model_name(&self) -> &str;
}

/// Build the configured embedding provider.
pub fn create_embedding_provider(
    config: &EmbeddingConfig,
    http: reqwest::Client,
) -> Result<Arc<dyn EmbeddingProvider>> {
    match config {
        #[cfg(feature = "openai")]
        EmbeddingConfig::OpenAI {
            api_key_env,
            api_base,
            model,
        } => {
            let api_key = crate::utils::toml_config::RelayConfig::resolve_env(api_key_env)
                .map_err(|e| AppError::Configuration(e.to_string()))?;
            Ok(Arc::new(OpenAIEmbeddings::new(
                http,
                api_key,
                api_base.clone(),
                model.clone(),
            )))
        }

        #[cfg(feature = "ollama")]
        EmbeddingConfig::Ollama { base_url, model } => Ok(Arc::new(OllamaEmbeddings::new(
            http,
            base_url.clone(),
            model.clone(),
        ))),

        #[allow(unreachable_patterns)]
        _ => {
            let _ = http;
            Err(AppError::Configuration(
                "Embedding provider not enabled. Check feature flags.".into(),
            ))
        }
    }
}

fn check_count(expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(AppError::Upstream(format!(
            "Embedding provider returned {} vectors for {} inputs",
            got, expected
        )));
    }
    Ok(())
}

// ============================================================================
// OpenAI
// ============================================================================

#[cfg(feature = "openai")]
pub struct OpenAIEmbeddings {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbedding>,
}

#[derive(Deserialize)]
struct OpenAIEmbedding {
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(feature = "openai")]
impl OpenAIEmbeddings {
    pub fn new(http: reqwest::Client, api_key: String, api_base: String, model: String) -> Self {
        Self {
            http,
            api_key,
            api_base,
            model,
        }
    }
}

#[cfg(feature = "openai")]
#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddings {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .http
            .post(join_url(&self.api_base, "embeddings"))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("OpenAI embeddings request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "OpenAI embeddings returned {}: {}",
                status, body
            )));
        }

        let mut parsed: OpenAIEmbeddingResponse = response.json().await.map_err(|e| {
            AppError::Upstream(format!("Malformed OpenAI embeddings response: {}", e))
        })?;

        check_count(texts.len(), parsed.data.len())?;
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Ollama
// ============================================================================

#[cfg(feature = "ollama")]
pub struct OllamaEmbeddings {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[cfg(feature = "ollama")]
impl OllamaEmbeddings {
    pub fn new(http: reqwest::Client, base_url: String, model: String) -> Self {
        Self {
            http,
            base_url,
            model,
        }
    }
}

#[cfg(feature = "ollama")]
#[async_trait]
impl EmbeddingProvider for OllamaEmbeddings {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .http
            .post(join_url(&self.base_url, "api/embed"))
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Ollama embed request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Ollama embed returned {}: {}",
                status, body
            )));
        }

        let parsed: OllamaEmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Malformed Ollama embed response: {}", e)))?;

        check_count(texts.len(), parsed.embeddings.len())?;
        Ok(parsed.embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_count() {
        assert!(check_count(2, 2).is_ok());
        let err = check_count(3, 1).unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[test]
    fn test_openai_response_parsing() {
        let body = r#"{"object":"list","data":[
            {"object":"embedding","index":1,"embedding":[0.0,1.0]},
            {"object":"embedding","index":0,"embedding":[1.0,0.0]}
        ],"model":"text-embedding-ada-002"}"#;
        let parsed: OpenAIEmbeddingResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data.len(), 2);
        assert_eq!(parsed.data[0].index, 1);
    }
}
