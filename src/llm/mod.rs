//! LLM Provider Clients and Abstractions
//!
//! This module provides a unified streaming interface over hosted language
//! models. The rest of the application only sees [`LLMClient`] and the
//! [`FragmentStream`] it returns.
//!
//! # Architecture
//!
//! - [`LLMClient`] - The core trait that all providers implement
//! - [`Provider`] - Resolved provider settings, builds clients
//!
//! # Supported Providers
//!
//! Enable providers via Cargo features:
//! - `openai` - OpenAI API and compatible endpoints
//! - `ollama` - Local Ollama server
//!
//! # Example
//!
//! ```ignore
//! use relay::llm::Provider;
//! use relay::types::Message;
//! use futures::StreamExt;
//!
//! let client = Provider::Ollama {
//!     base_url: "http://localhost:11434".to_string(),
//!     model: "llama3.2".to_string(),
//! }
//! .create_client(reqwest::Client::new())?;
//!
//! let mut stream = client.stream_chat(&[Message::user("What is 2+2?")]).await?;
//! while let Some(fragment) = stream.next().await {
//!     print!("{}", fragment?);
//! }
//! ```

/// Core LLM client trait and streaming response types.
pub mod client;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{FragmentStream, LLMClient, Provider};
