//! HTTP API Handlers and Routes
//!
//! The HTTP surface of the relay, built on the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! - `GET /` - Bundled browser chat page
//! - `POST /api/chat` - Send the conversation, receive the reply as a text stream
//! - `GET /api/health` - Health check endpoint
//! - `GET /api/openapi.json` - OpenAPI document
//!
//! # Streaming
//!
//! A successful chat response is `200 OK` with
//! `Content-Type: text/plain; charset=utf-8` and a chunked body carrying the
//! completion text as it is produced. Errors detected before the first
//! fragment are JSON bodies of the form:
//!
//! ```json
//! { "error": "Last message must come from the user, got 'assistant'", "kind": "invalid_request" }
//! ```
//!
//! A failure after streaming has started aborts the connection.

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;
