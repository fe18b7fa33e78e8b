use std::sync::Arc;

use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Body of the health-check response.
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Fixed "ok" marker.
    pub status: &'static str,
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Server is up", body = HealthResponse)),
)]
pub async fn health() -> impl IntoResponse {
    metrics::counter!("health_checks_total", "endpoint" => "health", "status" => "ok")
        .increment(1);
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// Routes for health checks.
pub fn create_health_router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}
