use bytes::Bytes;
use futures_util::Stream;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use shared::{config::llm::LlmConfig, models::ChatMessage};
use thiserror::Error;
use tracing::debug;

/// Failures raised before any upstream frame has been decoded.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// No API key is configured, so no call can be made.
    #[error("upstream API key is not configured")]
    MissingApiKey,

    /// The request never produced a response (DNS, connect, TLS, ...).
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The upstream rejected the request before streaming started.
    #[error("upstream rejected the request with status {status}")]
    Status {
        /// HTTP status returned by the upstream.
        status: StatusCode,
        /// `error.message` extracted from the response body, when present.
        message: Option<String>,
    },
}

/// Body of an upstream chat-completion call.
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

/// Client for the upstream chat-completion API.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl UpstreamClient {
    /// Creates a client for the configured upstream.
    #[must_use]
    pub fn new(config: LlmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Opens a streaming chat-completion call and returns the raw byte
    /// stream of the response body.
    ///
    /// # Errors
    /// Returns an [`UpstreamError`] when the key is missing, the request
    /// cannot be sent, or the upstream answers with a non-success status.
    pub async fn stream_chat(
        &self,
        messages: &[ChatMessage],
    ) -> Result<impl Stream<Item = reqwest::Result<Bytes>>, UpstreamError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(UpstreamError::MissingApiKey)?;

        let body = CompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: true,
        };

        debug!(model = %self.config.model, count = messages.len(), "opening upstream stream");

        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status,
                message: extract_error_message(&body),
            });
        }

        Ok(response.bytes_stream())
    }
}

/// Pulls `error.message` out of an upstream error body, when it has one.
fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .filter(|message| !message.is_empty())
        .map(ToString::to_string)
}
