//! Client-side conversation state.

use crate::types::{Message, Role};

/// Shown in place of (or after) the reply when a turn fails.
pub const APOLOGY: &str = "I'm sorry, but I encountered an error. Please try again later.";

/// The authoritative local copy of a conversation.
///
/// A turn appends the user message plus an empty assistant placeholder. The
/// placeholder is filled in as the reply streams in.
#[derive(Debug, Clone)]
pub struct ChatSession {
    messages: Vec<Message>,
    in_flight: bool,
}

impl ChatSession {
    /// Start a conversation seeded with the assistant's greeting.
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::assistant(greeting)],
            in_flight: false,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Start a turn. Returns the payload to send, which is the history up
    /// to and including the new user message but not the placeholder.
    ///
    /// Blank input and a second send while a turn is in flight are ignored.
    pub fn begin_turn(&mut self, input: &str) -> Option<Vec<Message>> {
        if input.trim().is_empty() || self.in_flight {
            return None;
        }

        self.messages.push(Message::user(input));
        let payload = self.messages.clone();
        self.messages.push(Message::assistant(""));
        self.in_flight = true;
        Some(payload)
    }

    /// Text of the reply currently being streamed.
    pub fn reply(&self) -> &str {
        match self.messages.last() {
            Some(m) if self.in_flight && m.role == Role::Assistant => &m.content,
            _ => "",
        }
    }

    pub fn append_to_reply(&mut self, text: &str) {
        if !self.in_flight {
            return;
        }
        if let Some(placeholder) = self.messages.last_mut() {
            placeholder.content.push_str(text);
        }
    }

    pub fn finish_turn(&mut self) {
        self.in_flight = false;
    }

    /// End the turn with the apology. Text already received is kept.
    pub fn fail_turn(&mut self) {
        if !self.in_flight {
            return;
        }
        if let Some(placeholder) = self.messages.last_mut() {
            if placeholder.content.is_empty() {
                placeholder.content = APOLOGY.to_string();
            } else {
                placeholder.content.push_str("\n\n");
                placeholder.content.push_str(APOLOGY);
            }
        }
        self.in_flight = false;
    }
}
