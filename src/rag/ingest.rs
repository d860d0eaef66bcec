//! Document ingestion: file → text → chunks → embeddings → vector records.
//!
//! Record ids are the ordinal of the chunk within one ingestion run
//! (`"0"`, `"1"`, ...), so ingesting the same documents again overwrites
//! the same records instead of adding duplicates.

use crate::db::vectorstore::VectorIndex;
use crate::rag::chunker::TextChunker;
use crate::rag::embeddings::EmbeddingProvider;
use crate::types::{AppError, Chunk, RecordMetadata, Result, VectorRecord};
use crate::utils::toml_config::RagConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    pub upserted: usize,
}

pub struct Ingestor {
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    embed_batch_size: usize,
    upsert_batch_size: usize,
}

/// Read a document as plain text. PDFs go through `pdf-extract`, anything
/// else is read as UTF-8.
pub fn load_document(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .map_err(|e| AppError::Ingestion(format!("Failed to read {}: {}", path.display(), e)))?;

    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    if is_pdf {
        pdf_extract::extract_text_from_mem(&bytes).map_err(|e| {
            AppError::Ingestion(format!("PDF extraction failed for {}: {}", path.display(), e))
        })
    } else {
        String::from_utf8(bytes).map_err(|_| {
            AppError::Ingestion(format!("{} is neither a PDF nor UTF-8 text", path.display()))
        })
    }
}

/// Keep only ASCII letters, digits, spaces and `.,?!`.
///
/// Applied to the embedding input only; stored metadata keeps the original text.
pub fn sanitize_for_embedding(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '.' | ',' | '?' | '!'))
        .collect()
}

impl Ingestor {
    pub fn new(
        chunker: TextChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            chunker,
            embedder,
            index,
            embed_batch_size: 100,
            upsert_batch_size: 100,
        }
    }

    pub fn from_config(
        rag: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Result<Self> {
        let chunker = TextChunker::new(rag.chunk_size, rag.chunk_overlap, &rag.encoding)?;
        Ok(Self::new(chunker, embedder, index)
            .with_batch_sizes(rag.embed_batch_size, rag.upsert_batch_size))
    }

    pub fn with_batch_sizes(mut self, embed_batch_size: usize, upsert_batch_size: usize) -> Self {
        self.embed_batch_size = embed_batch_size.max(1);
        self.upsert_batch_size = upsert_batch_size.max(1);
        self
    }

    /// Load, chunk, embed and upsert every document in `paths`.
    pub async fn ingest_paths(&self, paths: &[PathBuf]) -> Result<IngestReport> {
        let mut chunks = Vec::new();
        for path in paths {
            info!(path = %path.display(), "Loading document");
            let text = load_document(path)?;
            let doc_chunks = self.chunker.chunk(&text, &path.display().to_string());
            info!(path = %path.display(), chunks = doc_chunks.len(), "Split document");
            chunks.extend(doc_chunks);
        }

        let mut report = self.ingest_chunks(chunks).await?;
        report.documents = paths.len();
        Ok(report)
    }

    /// Chunk, embed and upsert a single in-memory document.
    pub async fn ingest_text(&self, text: &str, source: &str) -> Result<IngestReport> {
        let chunks = self.chunker.chunk(text, source);
        let mut report = self.ingest_chunks(chunks).await?;
        report.documents = 1;
        Ok(report)
    }

    async fn ingest_chunks(&self, chunks: Vec<Chunk>) -> Result<IngestReport> {
        // (original text, embedding input)
        let prepared: Vec<(String, String)> = chunks
            .into_iter()
            .filter(|chunk| !chunk.text.trim().is_empty())
            .map(|chunk| {
                let sanitized = sanitize_for_embedding(&chunk.text);
                (chunk.text, sanitized)
            })
            .filter(|(_, sanitized)| !sanitized.trim().is_empty())
            .collect();

        if prepared.is_empty() {
            return Err(AppError::Ingestion("No valid text data to embed".to_string()));
        }

        let mut vectors = Vec::with_capacity(prepared.len());
        for batch in prepared.chunks(self.embed_batch_size) {
            let inputs: Vec<String> = batch.iter().map(|(_, input)| input.clone()).collect();
            let embedded = self
                .embedder
                .embed_batch(&inputs)
                .await
                .map_err(|e| AppError::Ingestion(format!("Embedding failed: {}", e)))?;
            debug!(batch = embedded.len(), "Embedded batch");
            vectors.extend(embedded);
        }
        info!(embeddings = vectors.len(), model = %self.embedder.model_name(), "Generated document embeddings");

        let records: Vec<VectorRecord> = prepared
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, ((text, _), values))| VectorRecord {
                id: i.to_string(),
                values,
                metadata: RecordMetadata { text },
            })
            .collect();

        let mut upserted = 0;
        for batch in records.chunks(self.upsert_batch_size) {
            upserted += self
                .index
                .upsert(batch)
                .await
                .map_err(|e| AppError::Ingestion(format!("Upsert failed: {}", e)))?;
        }
        info!(
            records = records.len(),
            index = self.index.provider_name(),
            "Upserted vectors"
        );

        Ok(IngestReport {
            documents: 0,
            chunks: records.len(),
            upserted,
        })
    }
}
