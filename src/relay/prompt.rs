//! Prompt assembly for the completion provider.

use crate::types::{Message, Role};
use tracing::debug;

/// Synthesized user turn carrying retrieved context.
pub fn augmented_question(context: &str, question: &str) -> String {
    format!("{}\n\nQ: {}\nA:", context, question)
}

/// Build the message list sent upstream.
///
/// The result always starts with exactly one system message, the configured
/// `system_prompt`. With `context` the conversation collapses to a single
/// user turn built from the latest question; without it the history is
/// forwarded as-is. System messages supplied by the caller are dropped.
pub fn build_prompt(
    system_prompt: &str,
    conversation: &[Message],
    context: Option<&str>,
) -> Vec<Message> {
    let mut prompt = vec![Message::system(system_prompt)];

    match context {
        Some(context) => {
            let question = conversation
                .iter()
                .rev()
                .find(|m| m.role == Role::User)
                .map(|m| m.content.as_str())
                .unwrap_or_default();
            prompt.push(Message::user(augmented_question(context, question)));
        }
        None => {
            let dropped = conversation
                .iter()
                .filter(|m| m.role == Role::System)
                .count();
            if dropped > 0 {
                debug!(dropped, "Ignoring caller-supplied system messages");
            }
            prompt.extend(
                conversation
                    .iter()
                    .filter(|m| m.role != Role::System)
                    .cloned(),
            );
        }
    }

    prompt
}
