use crate::{AppState, types::HealthResponse};
use axum::{Json, extract::State};

/// Liveness and a summary of the configured pipeline
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Server is up", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: state.relay.model_name().to_string(),
        retrieval: state.relay.retriever().is_some(),
    })
}
