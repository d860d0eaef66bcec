//! The chat relay: conversation in, live completion text out.
//!
//! ```text
//! Idle → Validated → (Retrieving →) Prompted → Streaming → Closed | Errored
//! ```
//!
//! [`ChatRelay::handle`] runs everything up to and including the first
//! upstream fragment. Its errors are reported to the caller as ordinary
//! error responses. The returned stream carries the rest of the completion.

pub mod prompt;
pub mod stream;

use crate::llm::{FragmentStream, LLMClient};
use crate::rag::Retriever;
use crate::types::{AppError, Message, Result, latest_user_message};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

pub use prompt::build_prompt;

pub struct ChatRelay {
    llm: Arc<dyn LLMClient>,
    retriever: Option<Arc<Retriever>>,
    system_prompt: String,
    completion_timeout: Duration,
}

impl ChatRelay {
    pub fn new(llm: Arc<dyn LLMClient>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            retriever: None,
            system_prompt: system_prompt.into(),
            completion_timeout: Duration::from_secs(120),
        }
    }

    /// Augment every prompt with context from `retriever`.
    pub fn with_retriever(mut self, retriever: Arc<Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = timeout;
        self
    }

    pub fn retriever(&self) -> Option<&Arc<Retriever>> {
        self.retriever.as_ref()
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    /// Validate, retrieve, prompt and start streaming.
    pub async fn handle(&self, conversation: &[Message]) -> Result<FragmentStream> {
        let question = latest_user_message(conversation)?;

        let context = match &self.retriever {
            Some(retriever) => {
                let context = retriever.retrieve(&question.content).await?;
                debug!(context_bytes = context.len(), "Context retrieved");
                Some(context)
            }
            None => None,
        };

        let prompt = build_prompt(&self.system_prompt, conversation, context.as_deref());
        info!(
            messages = prompt.len(),
            augmented = context.is_some(),
            model = %self.llm.model_name(),
            "Starting completion"
        );

        let deadline = Instant::now() + self.completion_timeout;
        let upstream = tokio::time::timeout_at(deadline, self.llm.stream_chat(&prompt))
            .await
            .map_err(|_| {
                AppError::CompletionStream(
                    "Completion provider did not respond in time".to_string(),
                )
            })??;

        stream::prime(upstream, deadline).await
    }
}
