//! API request handlers.

/// Streaming chat handler.
pub mod chat;
/// Health check handler.
pub mod health;
