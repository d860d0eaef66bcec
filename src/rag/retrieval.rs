//! Query-time retrieval: question → embedding → nearest chunks → context block.

use crate::db::vectorstore::VectorIndex;
use crate::rag::embeddings::EmbeddingProvider;
use crate::types::{AppError, QueryMatch, Result};
use crate::utils::toml_config::RagConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
    timeout: Duration,
    require_context: bool,
}

/// Join match texts with `\n` in rank order. Matches without text are skipped.
pub fn join_context(matches: &[QueryMatch]) -> String {
    matches
        .iter()
        .filter_map(|m| m.metadata.as_ref().map(|meta| meta.text.as_str()))
        .collect::<Vec<_>>()
        .join("\n")
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            top_k: 5,
            timeout: Duration::from_secs(30),
            require_context: false,
        }
    }

    pub fn from_config(
        rag: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self::new(embedder, index)
            .with_top_k(rag.top_k)
            .with_timeout(rag.retrieval_timeout())
            .with_require_context(rag.require_context)
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_require_context(mut self, require_context: bool) -> Self {
        self.require_context = require_context;
        self
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Context block for `question`.
    ///
    /// Every failure, including the deadline elapsing, is a
    /// [`AppError::RetrievalFailure`].
    pub async fn retrieve(&self, question: &str) -> Result<String> {
        let matches = tokio::time::timeout(self.timeout, self.nearest(question))
            .await
            .map_err(|_| {
                AppError::RetrievalFailure(format!(
                    "Retrieval timed out after {}s",
                    self.timeout.as_secs_f32()
                ))
            })??;

        if matches.is_empty() {
            if self.require_context {
                return Err(AppError::RetrievalFailure(
                    "Vector index returned no matches".to_string(),
                ));
            }
            warn!("Vector index returned no matches, answering without context");
            return Ok(String::new());
        }

        debug!(matches = matches.len(), "Retrieved context");
        Ok(join_context(&matches))
    }

    async fn nearest(&self, question: &str) -> Result<Vec<QueryMatch>> {
        let vector = self
            .embedder
            .embed(question)
            .await
            .map_err(|e| AppError::RetrievalFailure(format!("Query embedding failed: {}", e)))?;

        self.index
            .query(&vector, self.top_k, true)
            .await
            .map_err(|e| AppError::RetrievalFailure(format!("Vector index query failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::vectorstore::InMemoryVectorIndex;
    use crate::types::{RecordMetadata, VectorRecord};
    use async_trait::async_trait;

    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| self.0.clone()).collect())
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    struct SlowEmbedder;

    #[async_trait]
    impl EmbeddingProvider for SlowEmbedder {
        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![])
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    fn record(id: &str, text: &str, values: Vec<f32>) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            values,
            metadata: RecordMetadata {
                text: text.to_string(),
            },
        }
    }

    #[test]
    fn test_join_context_keeps_rank_order() {
        let matches = vec![
            QueryMatch {
                id: "3".into(),
                score: 0.9,
                metadata: Some(RecordMetadata { text: "first".into() }),
            },
            QueryMatch {
                id: "1".into(),
                score: 0.5,
                metadata: None,
            },
            QueryMatch {
                id: "0".into(),
                score: 0.1,
                metadata: Some(RecordMetadata { text: "second".into() }),
            },
        ];
        assert_eq!(join_context(&matches), "first\nsecond");
    }

    #[tokio::test]
    async fn test_retrieve_joins_top_k() {
        let index = Arc::new(InMemoryVectorIndex::new());
        index
            .upsert(&[
                record("0", "about bonds", vec![0.0, 1.0]),
                record("1", "about stocks", vec![1.0, 0.0]),
                record("2", "mostly stocks", vec![0.8, 0.2]),
            ])
            .await
            .unwrap();

        let retriever =
            Retriever::new(Arc::new(FixedEmbedder(vec![1.0, 0.0])), index).with_top_k(2);
        let context = retriever.retrieve("stocks?").await.unwrap();
        assert_eq!(context, "about stocks\nmostly stocks");
    }

    #[tokio::test]
    async fn test_empty_index_policy() {
        let lenient = Retriever::new(
            Arc::new(FixedEmbedder(vec![1.0])),
            Arc::new(InMemoryVectorIndex::new()),
        );
        assert_eq!(lenient.retrieve("q").await.unwrap(), "");

        let strict = Retriever::new(
            Arc::new(FixedEmbedder(vec![1.0])),
            Arc::new(InMemoryVectorIndex::new()),
        )
        .with_require_context(true);
        assert!(matches!(
            strict.retrieve("q").await.unwrap_err(),
            AppError::RetrievalFailure(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_retrieval_failure() {
        let retriever = Retriever::new(Arc::new(SlowEmbedder), Arc::new(InMemoryVectorIndex::new()))
            .with_timeout(Duration::from_secs(1));

        let err = retriever.retrieve("q").await.unwrap_err();
        assert!(matches!(err, AppError::RetrievalFailure(_)));
        assert!(err.to_string().contains("timed out"));
    }
}
