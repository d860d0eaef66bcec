//! Chat client for the relay's streaming endpoint.
//!
//! Keeps the conversation locally, posts it to `POST /api/chat`, and feeds
//! the reply into the conversation as it streams in. Used by the
//! `relay-server chat` terminal client.
//!
//! # Example
//!
//! ```ignore
//! use relay::client::{ChatClient, ChatSession};
//!
//! let client = ChatClient::new(reqwest::Client::new(), "http://127.0.0.1:3000");
//! let mut session = ChatSession::new("Hi! How can I help you today?");
//!
//! client
//!     .send_turn(&mut session, "Is a recession coming?", |piece| print!("{}", piece))
//!     .await?;
//! ```

pub mod decoder;
pub mod session;

pub use decoder::Utf8StreamDecoder;
pub use session::{APOLOGY, ChatSession};

use crate::types::{AppError, Message, Result};
use crate::utils::http::join_url;
use futures::StreamExt;
use tracing::warn;

pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ChatClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            endpoint: join_url(base_url, "api/chat"),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one user turn and stream the reply into `session`.
    ///
    /// `on_update` receives every decoded piece of the reply as it arrives.
    /// Returns `Ok(false)` when the input was ignored (blank, or a turn is
    /// already in flight). On failure the session already shows the apology
    /// and the transport error is returned for reporting.
    pub async fn send_turn<F>(
        &self,
        session: &mut ChatSession,
        input: &str,
        mut on_update: F,
    ) -> Result<bool>
    where
        F: FnMut(&str),
    {
        let Some(payload) = session.begin_turn(input) else {
            return Ok(false);
        };

        match self.stream_reply(&payload, session, &mut on_update).await {
            Ok(()) => {
                session.finish_turn();
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "Chat turn failed");
                session.fail_turn();
                Err(e)
            }
        }
    }

    async fn stream_reply<F>(
        &self,
        payload: &[Message],
        session: &mut ChatSession,
        on_update: &mut F,
    ) -> Result<()>
    where
        F: FnMut(&str),
    {
        let response = self
            .http
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Transport(format!(
                "Server returned {}: {}",
                status, body
            )));
        }

        let mut decoder = Utf8StreamDecoder::new();
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk =
                chunk.map_err(|e| AppError::Transport(format!("Stream interrupted: {}", e)))?;
            let piece = decoder.decode(&chunk);
            if !piece.is_empty() {
                session.append_to_reply(&piece);
                on_update(&piece);
            }
        }

        let tail = decoder.finish();
        if !tail.is_empty() {
            session.append_to_reply(&tail);
            on_update(&tail);
        }

        Ok(())
    }
}
