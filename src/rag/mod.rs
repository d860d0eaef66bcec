//! Retrieval Augmented Generation (RAG) Pipeline
//!
//! # Module Structure
//!
//! - [`rag::chunker`](crate::rag::chunker) - Token-bounded text chunking
//! - [`rag::embeddings`](crate::rag::embeddings) - Hosted embedding providers (OpenAI, Ollama)
//! - [`rag::ingest`](crate::rag::ingest) - Document loading and batched upsert
//! - [`rag::retrieval`](crate::rag::retrieval) - Query-time context lookup
//!
//! # RAG Pipeline
//!
//! 1. **Ingestion** - Documents are chunked, embedded and upserted (`relay-server ingest`)
//! 2. **Retrieval** - The latest question is embedded, the top-k chunks are fetched
//! 3. **Generation** - The completion is prompted with the joined chunk texts
//!
//! # Example
//!
//! ```ignore
//! use relay::rag::{ingest::Ingestor, retrieval::Retriever};
//!
//! let ingestor = Ingestor::from_config(&config.rag, embedder.clone(), index.clone())?;
//! ingestor.ingest_paths(&["report.pdf".into()]).await?;
//!
//! let retriever = Retriever::from_config(&config.rag, embedder, index);
//! let context = retriever.retrieve("Is a recession coming?").await?;
//! ```

pub mod chunker;
pub mod embeddings;
pub mod ingest;
pub mod retrieval;

pub use embeddings::{EmbeddingProvider, create_embedding_provider};
pub use ingest::{IngestReport, Ingestor};
pub use retrieval::Retriever;
