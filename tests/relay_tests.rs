//! Relay behaviour below the HTTP layer: fragment ordering, mid-stream
//! failures and what happens when the consumer goes away.

mod common;

use common::mocks::{MockEmbeddingProvider, MockLLMClient};
use futures::StreamExt;
use relay::{
    AppError, ChatRelay, Ingestor, Retriever,
    db::{InMemoryVectorIndex, VectorIndex},
    rag::chunker::TextChunker,
    types::Message,
};
use rstest::rstest;
use std::sync::Arc;

fn relay_with(llm: &MockLLMClient) -> ChatRelay {
    ChatRelay::new(Arc::new(llm.clone()), "system")
}

fn hello() -> Vec<Message> {
    vec![Message::user("Hello")]
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(10)]
#[case(250)]
#[tokio::test]
async fn test_body_is_concatenation_of_fragments(#[case] n: usize) {
    let owned: Vec<String> = (0..n).map(|i| format!("[{}]", i)).collect();
    let fragments: Vec<&str> = owned.iter().map(String::as_str).collect();
    let llm = MockLLMClient::new(&fragments);

    let stream = relay_with(&llm).handle(&hello()).await.unwrap();
    let received: Vec<String> = stream.map(|item| item.unwrap()).collect().await;

    assert_eq!(received.concat(), owned.concat());
    assert_eq!(llm.pulled(), n);
}

#[tokio::test]
async fn test_empty_fragments_are_not_relayed() {
    let llm = MockLLMClient::new(&["", "a", "", "b", ""]);

    let stream = relay_with(&llm).handle(&hello()).await.unwrap();
    let received: Vec<String> = stream.map(|item| item.unwrap()).collect().await;

    assert_eq!(received, vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test]
async fn test_mid_stream_error_ends_the_body() {
    let llm = MockLLMClient::new(&["one ", "two ", "three"]).with_error_after(2);

    let mut stream = relay_with(&llm).handle(&hello()).await.unwrap();

    assert_eq!(stream.next().await.unwrap().unwrap(), "one ");
    assert_eq!(stream.next().await.unwrap().unwrap(), "two ");
    let err = stream.next().await.unwrap().unwrap_err();
    assert!(matches!(err, AppError::CompletionStream(_)));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_consumer_disconnect_releases_upstream() {
    let fragments: Vec<String> = (0..10).map(|i| i.to_string()).collect();
    let refs: Vec<&str> = fragments.iter().map(String::as_str).collect();
    let llm = MockLLMClient::new(&refs);

    let mut stream = relay_with(&llm).handle(&hello()).await.unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap(), "0");
    assert!(!llm.stream_dropped());

    drop(stream);

    assert!(llm.stream_dropped());
    assert_eq!(llm.pulled(), 1);
}

#[tokio::test]
async fn test_invalid_conversation_never_reaches_provider() {
    let llm = MockLLMClient::new(&["x"]);

    let err = relay_with(&llm)
        .handle(&[Message::assistant("Hi")])
        .await
        .err()
        .unwrap();

    assert!(matches!(err, AppError::InvalidRequest(_)));
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_require_context_rejects_empty_index() {
    let llm = MockLLMClient::new(&["x"]);
    let retriever = Retriever::new(
        Arc::new(MockEmbeddingProvider::new(vec![1.0, 0.0])),
        Arc::new(InMemoryVectorIndex::new()),
    )
    .with_require_context(true);
    let relay = relay_with(&llm).with_retriever(Arc::new(retriever));

    let err = relay.handle(&hello()).await.err().unwrap();

    assert!(matches!(err, AppError::RetrievalFailure(_)));
    assert_eq!(llm.calls(), 0);
}

// ============= Ingestion =============

fn ingestor(embedder: &MockEmbeddingProvider, index: Arc<InMemoryVectorIndex>) -> Ingestor {
    let chunker = TextChunker::new(20, 5, "p50k_base").unwrap();
    Ingestor::new(chunker, Arc::new(embedder.clone()), index).with_batch_sizes(3, 2)
}

fn document() -> String {
    (0..40)
        .map(|i| format!("Sentence number {} talks about the market.", i))
        .collect::<Vec<_>>()
        .join(" ")
}

#[tokio::test]
async fn test_reingestion_overwrites_instead_of_duplicating() {
    let embedder = MockEmbeddingProvider::new(vec![0.5, 0.5]);
    let index = Arc::new(InMemoryVectorIndex::new());
    let ingestor = ingestor(&embedder, index.clone());

    let first = ingestor.ingest_text(&document(), "doc.txt").await.unwrap();
    let count_after_first = index.count().await.unwrap();
    let second = ingestor.ingest_text(&document(), "doc.txt").await.unwrap();

    assert!(first.chunks > 1);
    assert_eq!(first, second);
    assert_eq!(count_after_first, first.chunks);
    assert_eq!(index.count().await.unwrap(), first.chunks);
}

#[tokio::test]
async fn test_ingestion_batches_and_stores_original_text() {
    let embedder = MockEmbeddingProvider::new(vec![1.0, 0.0]);
    let index = Arc::new(InMemoryVectorIndex::new());
    let ingestor = ingestor(&embedder, index.clone());

    let report = ingestor
        .ingest_text("Profit & loss: 12% — up!", "pnl.txt")
        .await
        .unwrap();

    assert_eq!(report.chunks, 1);
    assert_eq!(report.upserted, 1);
    assert_eq!(embedder.inputs(), vec!["Profit  loss 12  up!".to_string()]);

    let matches = index.query(&[1.0, 0.0], 1, true).await.unwrap();
    assert_eq!(matches[0].id, "0");
    assert_eq!(
        matches[0].metadata.as_ref().unwrap().text,
        "Profit & loss: 12% — up!"
    );
}

#[tokio::test]
async fn test_ingesting_only_blank_text_fails() {
    let embedder = MockEmbeddingProvider::new(vec![1.0]);
    let index = Arc::new(InMemoryVectorIndex::new());

    let err = ingestor(&embedder, index.clone())
        .ingest_text("   \n\t  ", "blank.txt")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Ingestion(_)));
    assert_eq!(embedder.calls(), 0);
    assert_eq!(index.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_ingest_paths_reads_text_files() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.md");
    std::fs::write(&a, "Bonds rallied.").unwrap();
    std::fs::write(&b, "Equities slipped.").unwrap();

    let embedder = MockEmbeddingProvider::new(vec![1.0, 0.0]);
    let index = Arc::new(InMemoryVectorIndex::new());
    let report = ingestor(&embedder, index.clone())
        .ingest_paths(&[a, b])
        .await
        .unwrap();

    assert_eq!(report.documents, 2);
    assert_eq!(report.chunks, 2);
    assert_eq!(index.count().await.unwrap(), 2);
}
