//! Request tracing for the relay surface.

use axum::http::Request;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{MakeSpan, TraceLayer};
use tracing::Span;

/// Span factory: one span per request, labeled with method and path.
///
/// The relay has no request identity beyond the route itself (no sessions,
/// no per-user context), so the span carries nothing else.
#[derive(Clone, Copy)]
pub(crate) struct RelaySpan;

impl<B> MakeSpan<B> for RelaySpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        tracing::info_span!(
            "request",
            method = %request.method(),
            path = %request.uri().path(),
        )
    }
}

/// Trace layer for HTTP request logging, with default response and failure
/// handlers under the relay's span.
pub fn trace_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, RelaySpan> {
    TraceLayer::new_for_http().make_span_with(RelaySpan)
}
