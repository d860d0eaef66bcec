use crate::AppState;
use crate::api::handlers::{chat, health};
use crate::types::{ErrorResponse, HealthResponse, Message, Role};
use axum::{
    Json, Router,
    response::Html,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;

const CHAT_PAGE: &str = include_str!("../../static/index.html");

#[derive(OpenApi)]
#[openapi(
    info(title = "Relay Server", description = "Streaming retrieval-augmented chat relay"),
    paths(chat::chat, health::health),
    components(schemas(Message, Role, ErrorResponse, HealthResponse)),
    tags(
        (name = "chat", description = "Streaming chat"),
        (name = "health", description = "Service status")
    )
)]
pub struct ApiDoc;

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat::chat))
        .route("/health", get(health::health))
        .route("/openapi.json", get(openapi))
}

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn index() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

/// Full application router with middleware, bound to `state`.
pub fn create_router(state: AppState) -> Router {
    let max_body_bytes = state.config.server.max_body_bytes;

    Router::new()
        .route("/", get(index))
        .nest("/api", api_routes())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
