use std::sync::{Arc, LazyLock};

use axum::{
    Router,
    http::header,
    response::IntoResponse,
    routing::get,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::app_state::AppState;

static RECORDER: LazyLock<PrometheusHandle> = LazyLock::new(|| {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
});

/// Installs the global Prometheus recorder. Counters incremented before
/// installation are lost, so startup calls this before serving traffic.
pub fn install_recorder() {
    LazyLock::force(&RECORDER);
}

async fn export_metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        RECORDER.render(),
    )
}

/// Routes for the Prometheus exposition endpoint.
pub fn create_metrics_router() -> Router<Arc<AppState>> {
    Router::new().route("/metrics", get(export_metrics))
}
