//! Token-bounded text chunking.

use crate::types::{AppError, Chunk, Result};
use text_splitter::{ChunkConfig, TextSplitter};
use tiktoken_rs::CoreBPE;

/// Splits documents into ordered, overlapping chunks measured in BPE tokens.
pub struct TextChunker {
    splitter: TextSplitter<CoreBPE>,
}

fn load_encoding(name: &str) -> Result<CoreBPE> {
    let bpe = match name {
        "p50k_base" => tiktoken_rs::p50k_base(),
        "r50k_base" => tiktoken_rs::r50k_base(),
        "cl100k_base" => tiktoken_rs::cl100k_base(),
        "o200k_base" => tiktoken_rs::o200k_base(),
        other => {
            return Err(AppError::Configuration(format!(
                "Unsupported tokenizer encoding '{}'",
                other
            )));
        }
    };
    bpe.map_err(|e| AppError::Configuration(format!("Failed to load encoding '{}': {}", name, e)))
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize, encoding: &str) -> Result<Self> {
        let bpe = load_encoding(encoding)?;
        let config = ChunkConfig::new(chunk_size)
            .with_overlap(chunk_overlap)
            .map_err(|e| AppError::Configuration(format!("Invalid chunk settings: {}", e)))?
            .with_sizer(bpe);

        Ok(Self {
            splitter: TextSplitter::new(config),
        })
    }

    /// Chunk `text` in document order. Whitespace-only chunks are dropped.
    pub fn chunk(&self, text: &str, source: &str) -> Vec<Chunk> {
        self.splitter
            .chunks(text)
            .filter(|piece| !piece.trim().is_empty())
            .enumerate()
            .map(|(index, piece)| Chunk {
                text: piece.to_string(),
                source: source.to_string(),
                index,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunker = TextChunker::new(2000, 100, "p50k_base").unwrap();
        let chunks = chunker.chunk("Stocks rose on Tuesday.", "notes.txt");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Stocks rose on Tuesday.");
        assert_eq!(chunks[0].source, "notes.txt");
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn test_long_text_respects_token_budget() {
        let chunker = TextChunker::new(20, 5, "p50k_base").unwrap();
        let text = "The market opened higher today. ".repeat(40);
        let chunks = chunker.chunk(&text, "doc");

        assert!(chunks.len() > 1);
        let bpe = tiktoken_rs::p50k_base().unwrap();
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert!(bpe.encode_ordinary(&chunk.text).len() <= 20);
        }
    }

    #[test]
    fn test_blank_text_yields_nothing() {
        let chunker = TextChunker::new(100, 10, "cl100k_base").unwrap();
        assert!(chunker.chunk("   \n\n  ", "empty").is_empty());
    }

    #[test]
    fn test_invalid_settings() {
        assert!(TextChunker::new(100, 10, "gpt2-bogus").is_err());
        assert!(TextChunker::new(10, 20, "p50k_base").is_err());
    }
}
