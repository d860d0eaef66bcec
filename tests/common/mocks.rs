//! Mock implementations for testing.
//!
//! Scripted completion and embedding clients that record how they were
//! used, so tests can assert on prompts, call counts and stream lifetime
//! without any network access.

use async_trait::async_trait;
use parking_lot::Mutex;
use relay::llm::{FragmentStream, LLMClient};
use relay::rag::EmbeddingProvider;
use relay::types::{AppError, Message, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Sets its flag when dropped; lives inside a mock stream.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Mock completion client replaying a fixed list of fragments.
///
/// # Examples
///
/// ```ignore
/// let llm = MockLLMClient::new(&["Hel", "lo"]);
/// let failing = MockLLMClient::failing();
/// let broken = MockLLMClient::new(&["a", "b"]).with_error_after(1);
/// let slow = MockLLMClient::new(&["a", "b"]).with_delay(Duration::from_millis(200));
/// ```
#[derive(Clone, Default)]
pub struct MockLLMClient {
    fragments: Vec<String>,
    fail_on_start: bool,
    error_after: Option<usize>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
    pulled: Arc<AtomicUsize>,
    dropped: Arc<AtomicBool>,
    prompts: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl MockLLMClient {
    pub fn new(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            ..Self::default()
        }
    }

    /// A client whose `stream_chat` fails before producing a stream.
    pub fn failing() -> Self {
        Self {
            fail_on_start: true,
            ..Self::default()
        }
    }

    /// Yield an error item once `n` fragments have been produced.
    pub fn with_error_after(mut self, n: usize) -> Self {
        self.error_after = Some(n);
        self
    }

    /// Wait this long before every fragment after the first.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times `stream_chat` was called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of fragments the upstream has produced so far.
    pub fn pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }

    /// Whether the most recent stream has been dropped.
    pub fn stream_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }

    /// The prompt sent with the most recent call.
    pub fn last_prompt(&self) -> Option<Vec<Message>> {
        self.prompts.lock().last().cloned()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn stream_chat(&self, messages: &[Message]) -> Result<FragmentStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(messages.to_vec());

        if self.fail_on_start {
            return Err(AppError::CompletionStream("Mock completion failure".to_string()));
        }

        self.dropped.store(false, Ordering::SeqCst);
        let guard = DropFlag(self.dropped.clone());
        let pulled = self.pulled.clone();
        let fragments = self.fragments.clone();
        let error_after = self.error_after;
        let delay = self.delay;

        let stream = async_stream::stream! {
            let _guard = guard;
            let mut produced = 0;
            for fragment in fragments {
                if error_after == Some(produced) {
                    break;
                }
                if let Some(delay) = delay.filter(|_| produced > 0) {
                    tokio::time::sleep(delay).await;
                }
                pulled.fetch_add(1, Ordering::SeqCst);
                produced += 1;
                yield Ok(fragment);
            }
            if error_after.is_some_and(|n| n <= produced) {
                yield Err(AppError::CompletionStream("Mock stream broke".to_string()));
            }
        };

        Ok(Box::pin(stream))
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Mock embedding provider returning the same vector for every input.
#[derive(Clone)]
pub struct MockEmbeddingProvider {
    vector: Vec<f32>,
    should_fail: bool,
    calls: Arc<AtomicUsize>,
    inputs: Arc<Mutex<Vec<String>>>,
}

impl MockEmbeddingProvider {
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            vector,
            should_fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
            inputs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new(vec![1.0, 0.0])
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every text passed to `embed_batch`, in order.
    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().clone()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(AppError::Upstream("Mock embedding failure".to_string()));
        }
        self.inputs.lock().extend(texts.iter().cloned());
        Ok(texts.iter().map(|_| self.vector.clone()).collect())
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }
}
