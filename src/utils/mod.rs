//! Configuration and HTTP utilities.

/// Outbound HTTP client shared by provider clients.
pub mod http;
/// TOML configuration (`relay.toml`) loading and validation.
pub mod toml_config;
