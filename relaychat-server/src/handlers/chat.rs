use std::{convert::Infallible, sync::Arc};

use axum::{
    Json,
    extract::{Extension, State, rejection::JsonRejection},
    http::{HeaderName, HeaderValue, header},
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
};
use futures_util::StreamExt;
use reqwest::StatusCode;
use shared::{
    config::server::Config,
    models::{ChatMessage, ChatRequest, MessageRole, StreamEvent, StreamFrame},
    sse,
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::{
    app_state::AppState,
    http::error::{ApiError, AppResult},
    services::upstream::{UpstreamClient, UpstreamError},
};

/// Message relayed downstream when the upstream connection drops mid-reply.
const STREAM_INTERRUPTED: &str = "stream interrupted";

/// Relays one chat turn to the upstream API and streams the reply back.
///
/// Validation and configuration failures are rejected as conventional JSON
/// errors. Everything after that travels on the event stream: headers are
/// committed before the upstream call is made, so even an upstream
/// rejection is reported as a terminal `{error, done}` frame.
#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Event stream of relayed completion frames", content_type = "text/event-stream", body = StreamFrame),
        (status = 400, description = "Malformed or empty message list", body = shared::models::ErrorResponse),
        (status = 500, description = "Upstream credential is not configured", body = shared::models::ErrorResponse),
    ),
)]
pub async fn relay_chat(
    State(state): State<Arc<AppState>>,
    Extension(config): Extension<Arc<Config>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(payload) =
        payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    if payload.messages.is_empty() {
        return Err(ApiError::bad_request(
            "messages must be a non-empty array of {role, content} entries",
        ));
    }

    if config.llm.api_key.is_none() {
        return Err(ApiError::internal_server_error(
            "server configuration error: upstream API key is not set",
        ));
    }

    let messages = prepare_messages(payload.messages, &config.llm.system_prompt);

    let (tx, rx) = mpsc::channel::<Event>(32);
    let upstream = state.upstream.clone();
    tokio::spawn(async move {
        run_relay(upstream, messages, tx).await;
    });

    let stream = ReceiverStream::new(rx).map(Ok::<Event, Infallible>);
    let mut response = Sse::new(stream).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        HeaderName::from_static("x-accel-buffering"),
        HeaderValue::from_static("no"),
    );
    Ok(response)
}

/// Prepends the configured system prompt unless the caller already leads
/// with a system message. Idempotent: an existing system message is never
/// duplicated.
fn prepare_messages(mut messages: Vec<ChatMessage>, system_prompt: &str) -> Vec<ChatMessage> {
    let has_system_message = messages
        .first()
        .is_some_and(|message| message.role == MessageRole::System);

    if !has_system_message {
        messages.insert(
            0,
            ChatMessage {
                role: MessageRole::System,
                content: system_prompt.to_string(),
            },
        );
    }

    messages
}

/// Drives one proxied request: opens the upstream stream, decodes it chunk
/// by chunk, and re-emits normalized frames downstream until the first
/// terminal event.
async fn run_relay(upstream: UpstreamClient, messages: Vec<ChatMessage>, tx: mpsc::Sender<Event>) {
    let stream = match upstream.stream_chat(&messages).await {
        Ok(stream) => stream,
        Err(error) => {
            warn!(error = %error, "upstream request failed before streaming");
            metrics::counter!("relay_requests_total", "outcome" => "rejected").increment(1);
            send_frame(&tx, StreamFrame::error(humanize_upstream_error(&error))).await;
            return;
        }
    };
    tokio::pin!(stream);

    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(error = %error, "upstream stream dropped mid-reply");
                metrics::counter!("relay_requests_total", "outcome" => "interrupted")
                    .increment(1);
                send_frame(&tx, StreamFrame::error(STREAM_INTERRUPTED)).await;
                return;
            }
        };

        let (events, carry) = sse::process_chunk(std::mem::take(&mut buffer), &bytes);
        buffer = carry;

        for event in events {
            match event {
                StreamEvent::Content(text) => {
                    if !send_frame(&tx, StreamFrame::content(text)).await {
                        return;
                    }
                }
                // First terminal event wins; any further upstream data is
                // dropped with the connection.
                StreamEvent::Done => {
                    metrics::counter!("relay_requests_total", "outcome" => "completed")
                        .increment(1);
                    send_frame(&tx, StreamFrame::done()).await;
                    return;
                }
                StreamEvent::Error(message) => {
                    send_frame(&tx, StreamFrame::error(message)).await;
                    return;
                }
            }
        }
    }

    // Upstream closed without a sentinel line. The final fragment may still
    // hold frames (the sentinel itself can arrive unterminated), so flush
    // the carry through the same parser before synthesizing the terminal.
    debug!(pending = buffer.len(), "upstream closed; flushing carryover");
    for event in sse::flush(&buffer) {
        if let StreamEvent::Content(text) = event {
            if !send_frame(&tx, StreamFrame::content(text)).await {
                return;
            }
        }
    }

    metrics::counter!("relay_requests_total", "outcome" => "completed").increment(1);
    send_frame(&tx, StreamFrame::done()).await;
}

/// Serializes a frame onto the downstream channel. Returns `false` when the
/// client has gone away.
async fn send_frame(tx: &mpsc::Sender<Event>, frame: StreamFrame) -> bool {
    match serde_json::to_string(&frame) {
        Ok(data) => tx.send(Event::default().data(data)).await.is_ok(),
        Err(error) => {
            warn!(error = %error, "failed to encode stream frame");
            false
        }
    }
}

/// Maps an upstream failure to the user-facing message relayed downstream.
fn humanize_upstream_error(error: &UpstreamError) -> String {
    match error {
        UpstreamError::Status { status, message } => match *status {
            StatusCode::UNAUTHORIZED => {
                "The upstream API key was rejected; check the server configuration.".to_string()
            }
            StatusCode::TOO_MANY_REQUESTS => {
                "Too many requests; try again in a moment.".to_string()
            }
            _ => message
                .clone()
                .unwrap_or_else(|| "The upstream service failed; try again later.".to_string()),
        },
        UpstreamError::MissingApiKey | UpstreamError::Transport(_) => {
            "The upstream service failed; try again later.".to_string()
        }
    }
}
