use crate::{
    AppState,
    types::{AppError, ErrorResponse, Message},
};
use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::Response,
};
use tracing::{Instrument, info_span, warn};
use uuid::Uuid;

/// Chat with the assistant
///
/// The request body is the whole conversation so far. The reply is streamed
/// back as raw UTF-8 text while the model produces it.
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = Vec<Message>,
    responses(
        (status = 200, description = "Streamed completion text", content_type = "text/plain", body = String),
        (status = 400, description = "Invalid conversation", body = ErrorResponse),
        (status = 502, description = "Retrieval or completion provider failed", body = ErrorResponse)
    ),
    tag = "chat"
)]
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<Vec<Message>>, JsonRejection>,
) -> Result<Response, AppError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("chat", %request_id);

    async move {
        let Json(conversation) = payload.map_err(|rejection| {
            warn!(error = %rejection.body_text(), "Rejected chat payload");
            AppError::InvalidRequest(rejection.body_text())
        })?;

        tracing::info!(messages = conversation.len(), "Chat request");

        let stream = state.relay.handle(&conversation).await.inspect_err(|e| {
            warn!(kind = e.kind(), error = %e, "Chat request failed");
        })?;

        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .header(header::CACHE_CONTROL, "no-cache")
            .body(Body::from_stream(stream))
            .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
    }
    .instrument(span)
    .await
}
