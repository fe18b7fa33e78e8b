use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Extension, Router,
    http::{HeaderName, HeaderValue, Method, header},
    serve,
};
use shared::config::server::Config;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    app_state::AppState, openapi::openapi_routes, routes, services::upstream::UpstreamClient,
    tracer,
};

/// Initializes the tracing subscriber. An explicit `RUST_LOG` wins;
/// otherwise the configured level becomes the default directive.
pub fn initialize_tracing(config: &Config) {
    let filter = std::env::var(EnvFilter::DEFAULT_ENV)
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Creates the application state around the configured upstream client.
pub fn create_app_state(config: &Config) -> Arc<AppState> {
    Arc::new(AppState::new(UpstreamClient::new(config.llm.clone())))
}

/// Browser-facing CORS policy.
///
/// The API surface is narrow: JSON `POST`s, `GET` probes, and preflights.
/// Header allowances follow what the web client actually sends.
pub fn create_cors_layer(config: &Config) -> CorsLayer {
    let origins = config
        .server
        .cors
        .allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .expose_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(config.server.cors.max_age_seconds));

    if origins.is_empty() {
        // A wildcard origin cannot be combined with credentials.
        cors.allow_origin(AllowOrigin::any())
    } else {
        cors.allow_origin(origins)
            .allow_credentials(config.server.cors.allow_credentials)
    }
}

/// Creates the API router with all route modules.
pub fn create_api_router() -> Router<Arc<AppState>> {
    routes::chat::create_router_chat()
}

/// Creates the main application router with all middleware and routes.
pub fn create_app_router(state: Arc<AppState>, config: Arc<Config>) -> Router {
    let cors = create_cors_layer(&config);

    Router::new()
        .nest("/api", create_api_router())
        .merge(routes::health::create_health_router())
        .merge(routes::metrics::create_metrics_router())
        .merge(openapi_routes())
        .layer(Extension(config))
        .layer(cors)
        .layer(tracer::trace_layer())
        .with_state(state)
}

/// Resolves when a shutdown signal arrives. If the signal handler cannot be
/// installed, the server keeps running rather than stopping immediately.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down..."),
        Err(err) => {
            error!(error = %err, "failed to install shutdown signal handler");
            std::future::pending::<()>().await;
        }
    }
}

/// Starts the proxy server and binds it to the configured port.
///
/// # Errors
/// Returns an error if the server fails to start.
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    initialize_tracing(&config);
    routes::metrics::install_recorder();
    info!("Starting server...");

    if config.llm.api_key.is_none() {
        warn!("no upstream API key configured; chat requests will be rejected");
    }

    let config = Arc::new(config);
    let state = create_app_state(&config);
    let app = create_app_router(state, config.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn test_app() -> Router {
        let config = Arc::new(Config::default());
        let state = create_app_state(&config);
        create_app_router(state, config)
    }

    #[test]
    fn cors_layer_builds_with_and_without_origins() {
        let mut config = Config::default();
        let _ = create_cors_layer(&config);

        config.server.cors.allowed_origins.clear();
        let _ = create_cors_layer(&config);
    }

    #[tokio::test]
    async fn health_is_reachable_through_the_app_router() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_expose_app_counters() {
        routes::metrics::install_recorder();
        let app = test_app();

        // Generate at least one counter so the exposition is non-empty.
        let _ = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("health_checks_total"));
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(doc["paths"]["/api/chat"]["post"].is_object());
    }
}
