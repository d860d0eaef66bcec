use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============= Conversation Types =============

/// Author of a conversation turn.
///
/// Closed set: payloads carrying any other role are rejected when the
/// request body is deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Check that a conversation can be answered and return its newest user turn.
///
/// A conversation must be non-empty and end with a user message whose
/// content is not blank.
pub fn latest_user_message(conversation: &[Message]) -> Result<&Message> {
    let last = conversation
        .last()
        .ok_or_else(|| AppError::InvalidRequest("Conversation is empty".to_string()))?;

    if last.role != Role::User {
        return Err(AppError::InvalidRequest(format!(
            "Last message must come from the user, got '{}'",
            last.role.as_str()
        )));
    }

    if last.content.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "Last user message is empty".to_string(),
        ));
    }

    Ok(last)
}

// ============= RAG Types =============

/// A bounded slice of a source document, the unit of embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub text: String,
}

/// An embedded chunk as stored by the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: RecordMetadata,
}

/// One nearest-neighbour hit, ordered by descending score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RecordMetadata>,
}

// ============= API Response Types =============

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model: String,
    pub retrieval: bool,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Retrieval failure: {0}")]
    RetrievalFailure(String),

    #[error("Completion stream error: {0}")]
    CompletionStream(String),

    #[error("Transport error: {0}")]
    Transport(String),

    /// Embedding provider or vector index call failed
    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Ingestion error: {0}")]
    Ingestion(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable name used in error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::RetrievalFailure(_) => "retrieval_failure",
            AppError::CompletionStream(_) => "completion_stream_error",
            AppError::Transport(_) => "transport_error",
            AppError::Upstream(_) => "upstream_error",
            AppError::Ingestion(_) => "ingestion_error",
            AppError::Configuration(_) => "configuration_error",
            AppError::Internal(_) => "internal",
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let kind = self.kind().to_string();
        let (status, message) = match self {
            AppError::InvalidRequest(msg) => (axum::http::StatusCode::BAD_REQUEST, msg),
            AppError::RetrievalFailure(msg) => (axum::http::StatusCode::BAD_GATEWAY, msg),
            AppError::CompletionStream(msg) => (axum::http::StatusCode::BAD_GATEWAY, msg),
            AppError::Transport(msg) => (axum::http::StatusCode::BAD_GATEWAY, msg),
            AppError::Upstream(msg) => (axum::http::StatusCode::BAD_GATEWAY, msg),
            AppError::Ingestion(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Configuration(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Internal(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = ErrorResponse {
            error: message,
            kind,
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
