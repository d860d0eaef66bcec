//! Vector Index Abstraction Layer
//!
//! The relay talks to exactly one vector index, selected in configuration.
//! Ingestion writes records into it, and every augmented chat request
//! queries it for the chunks nearest to the question.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────┐
//! │           VectorIndex Trait           │
//! ├───────────────────────────────────────┤
//! │   upsert   │   query   │    count     │
//! └───────────────────────────────────────┘
//!          ▲                    ▲
//!          │                    │
//!    ┌─────┴─────┐        ┌─────┴────┐
//!    │ Pinecone  │        │ InMemory │
//!    │  (cloud)  │        │ (local)  │
//!    └───────────┘        └──────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use relay::db::vectorstore::{VectorIndex, VectorIndexProvider};
//!
//! let index = VectorIndexProvider::InMemory
//!     .create_index(reqwest::Client::new())
//!     .await?;
//!
//! index.upsert(&records).await?;
//! let matches = index.query(&query_embedding, 5, true).await?;
//! ```

use crate::types::{AppError, QueryMatch, Result, VectorRecord};
use crate::utils::toml_config::VectorIndexConfig;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// Vector Index Provider Configuration
// ============================================================================

/// Resolved settings for a vector index backend, credentials included.
#[derive(Debug, Clone)]
pub enum VectorIndexProvider {
    /// Pinecone - Managed cloud vector database.
    ///
    /// When `host` is `None` the data-plane host is looked up through the
    /// control plane by index name.
    #[cfg(feature = "pinecone")]
    Pinecone {
        api_key: String,
        index_name: String,
        host: Option<String>,
        namespace: Option<String>,
        control_plane_url: String,
    },

    /// Process-local index. Data is lost when the process exits.
    InMemory,
}

impl VectorIndexProvider {
    /// Resolve a provider from configuration, reading credentials from the environment.
    pub fn from_config(config: &VectorIndexConfig) -> Result<Self> {
        match config {
            #[cfg(feature = "pinecone")]
            VectorIndexConfig::Pinecone {
                api_key_env,
                index_name,
                host,
                namespace,
                control_plane_url,
            } => Ok(VectorIndexProvider::Pinecone {
                api_key: crate::utils::toml_config::RelayConfig::resolve_env(api_key_env)
                    .map_err(|e| AppError::Configuration(e.to_string()))?,
                index_name: index_name.clone(),
                host: host.clone(),
                namespace: namespace.clone(),
                control_plane_url: control_plane_url.clone(),
            }),

            VectorIndexConfig::Memory => Ok(VectorIndexProvider::InMemory),

            #[allow(unreachable_patterns)]
            _ => Err(AppError::Configuration(
                "Vector index provider not enabled. Check feature flags.".into(),
            )),
        }
    }

    /// Create a vector index instance from this provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the Pinecone host lookup fails.
    pub async fn create_index(&self, http: reqwest::Client) -> Result<Arc<dyn VectorIndex>> {
        match self {
            #[cfg(feature = "pinecone")]
            VectorIndexProvider::Pinecone {
                api_key,
                index_name,
                host,
                namespace,
                control_plane_url,
            } => {
                let host = match host {
                    Some(host) => host.clone(),
                    None => {
                        super::pinecone::describe_index_host(
                            &http,
                            control_plane_url,
                            api_key,
                            index_name,
                        )
                        .await?
                    }
                };
                Ok(Arc::new(super::pinecone::PineconeIndex::new(
                    http,
                    api_key.clone(),
                    &host,
                    namespace.clone(),
                )))
            }

            VectorIndexProvider::InMemory => {
                let _ = http;
                Ok(Arc::new(InMemoryVectorIndex::new()))
            }
        }
    }
}

// ============================================================================
// Vector Index Trait
// ============================================================================

/// Abstract trait for vector index operations.
///
/// # Implementors
///
/// - `PineconeIndex` - Managed cloud service
/// - `InMemoryVectorIndex` - Local runs and tests
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Get the name of this vector index provider.
    fn provider_name(&self) -> &'static str;

    /// Insert or overwrite records by id.
    ///
    /// # Returns
    ///
    /// Number of records written.
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize>;

    /// Nearest neighbours of `vector`, at most `top_k`, by descending score.
    ///
    /// Metadata is attached to each match only when `include_metadata` is set.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<QueryMatch>>;

    /// Count stored records.
    async fn count(&self) -> Result<usize>;
}

// ============================================================================
// In-Memory Vector Index
// ============================================================================

/// In-memory vector index using cosine similarity.
pub struct InMemoryVectorIndex {
    records: Arc<RwLock<HashMap<String, VectorRecord>>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Calculate cosine similarity between two vectors.
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }
}

impl Default for InMemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    fn provider_name(&self) -> &'static str {
        "in-memory"
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        let mut stored = self.records.write();
        for record in records {
            if record.values.is_empty() {
                return Err(AppError::Upstream(format!(
                    "Record '{}' has an empty vector",
                    record.id
                )));
            }
            stored.insert(record.id.clone(), record.clone());
        }
        Ok(records.len())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<QueryMatch>> {
        let stored = self.records.read();

        let mut matches: Vec<QueryMatch> = stored
            .values()
            .map(|record| QueryMatch {
                id: record.id.clone(),
                score: Self::cosine_similarity(vector, &record.values),
                metadata: include_metadata.then(|| record.metadata.clone()),
            })
            .collect();

        // Sort by score descending, ties by id for a stable order
        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(top_k);

        Ok(matches)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().len())
    }
}

// ============================================================================
// Tests
// ============================================================================
