//! Streaming consumer for the relay's event-stream responses.

use anyhow::{Context, Result};
use futures_util::{Stream, StreamExt};
use shared::{
    models::{ChatMessage, ChatRequest, ErrorResponse, StreamEvent, StreamFrame},
    sse,
};
use tokio_util::sync::CancellationToken;
use url::Url;

/// How one streamed reply ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The terminal `{done}` frame arrived (or the stream closed cleanly).
    Completed,
    /// The caller cancelled; partial content already delivered stands.
    Cancelled,
    /// The relay reported an error, or the request itself failed.
    Failed(String),
}

/// HTTP client for the relay's chat endpoint.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    base: Url,
}

impl ChatClient {
    /// Creates a client for the given server base URL.
    ///
    /// # Errors
    /// Fails when the URL is unparseable or the HTTP client cannot be built.
    pub fn new(server: &str) -> Result<Self> {
        let base = Url::parse(server).context("invalid server URL")?;
        let http = reqwest::Client::builder()
            .user_agent("relaychat-cli")
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, base })
    }

    /// Sends the full message history and consumes the streamed reply,
    /// invoking `on_chunk` for every content fragment.
    ///
    /// Cancellation aborts the read promptly and is reported as
    /// [`StreamOutcome::Cancelled`], never as a failure, so partial content
    /// stays intact. Malformed stream lines are skipped, mirroring the
    /// relay's own tolerance.
    ///
    /// # Errors
    /// Fails only on local problems (bad endpoint URL); remote failures are
    /// reported through [`StreamOutcome::Failed`].
    pub async fn send_message(
        &self,
        messages: &[ChatMessage],
        cancel: &CancellationToken,
        mut on_chunk: impl FnMut(&str),
    ) -> Result<StreamOutcome> {
        let endpoint = self.base.join("api/chat").context("invalid chat endpoint")?;
        let request = self.http.post(endpoint).json(&ChatRequest {
            messages: messages.to_vec(),
        });

        let response = tokio::select! {
            () = cancel.cancelled() => return Ok(StreamOutcome::Cancelled),
            result = request.send() => match result {
                Ok(response) => response,
                Err(error) => return Ok(StreamOutcome::Failed(error.to_string())),
            },
        };

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<ErrorResponse>()
                .await
                .map_or_else(|_| format!("server returned {status}"), |body| body.error);
            return Ok(StreamOutcome::Failed(message));
        }

        let events = relay_events(response);
        tokio::pin!(events);

        loop {
            let next = tokio::select! {
                () = cancel.cancelled() => return Ok(StreamOutcome::Cancelled),
                next = events.next() => next,
            };

            match next {
                Some(StreamEvent::Content(text)) => on_chunk(&text),
                Some(StreamEvent::Done) | None => return Ok(StreamOutcome::Completed),
                Some(StreamEvent::Error(message)) => return Ok(StreamOutcome::Failed(message)),
            }
        }
    }
}

/// Adapts a relay response body to a lazy sequence of normalized events,
/// re-buffering chunk fragments exactly like the server-side decoder.
fn relay_events(response: reqwest::Response) -> impl Stream<Item = StreamEvent> {
    async_stream::stream! {
        let mut bytes = std::pin::pin!(response.bytes_stream());
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(error) => {
                    yield StreamEvent::Error(error.to_string());
                    return;
                }
            };

            let (lines, carry) = sse::split_lines(std::mem::take(&mut buffer), &chunk);
            buffer = carry;

            for line in lines {
                if let Some(event) = parse_relay_line(&line) {
                    let terminal = !matches!(event, StreamEvent::Content(_));
                    yield event;
                    if terminal {
                        return;
                    }
                }
            }
        }

        // Stream closed without a terminal frame; the tail may still hold one.
        for line in sse::drain_lines(&buffer) {
            if let Some(event) = parse_relay_line(&line) {
                let terminal = !matches!(event, StreamEvent::Content(_));
                yield event;
                if terminal {
                    return;
                }
            }
        }
    }
}

/// Parses one `data:` line of the relay's frame format. Returns `None` for
/// unmarked or malformed lines, which are dropped without ceremony.
fn parse_relay_line(line: &str) -> Option<StreamEvent> {
    let payload = line.strip_prefix(sse::DATA_PREFIX)?;
    let frame: StreamFrame = serde_json::from_str(payload).ok()?;

    if let Some(message) = frame.error {
        return Some(StreamEvent::Error(message));
    }
    if let Some(content) = frame.content {
        if !content.is_empty() {
            return Some(StreamEvent::Content(content));
        }
    }
    frame.done.then_some(StreamEvent::Done)
}
