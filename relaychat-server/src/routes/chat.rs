use std::sync::Arc;

use axum::{Router, routing::post};

use crate::{app_state::AppState, handlers};

/// Routes for the chat relay.
pub fn create_router_chat() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(handlers::chat::relay_chat))
}
