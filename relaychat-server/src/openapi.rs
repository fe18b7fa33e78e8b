use std::sync::Arc;

use axum::{Json, Router, routing::get};
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document for the relay surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "RelayChat API",
        description = "Streaming chat proxy relaying upstream completions as an event stream."
    ),
    paths(crate::handlers::chat::relay_chat, crate::routes::health::health),
    components(schemas(
        shared::models::ChatRequest,
        shared::models::ChatMessage,
        shared::models::MessageRole,
        shared::models::StreamFrame,
        shared::models::ErrorResponse,
    )),
    tags(
        (name = "chat", description = "Streaming chat relay"),
        (name = "health", description = "Liveness probes"),
    )
)]
pub struct ApiDoc;

async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Routes serving the OpenAPI document.
pub fn openapi_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api-docs/openapi.json", get(serve_openapi))
}
