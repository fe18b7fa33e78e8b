use crate::services::upstream::UpstreamClient;

/// State shared across request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Client for the upstream chat-completion API.
    pub upstream: UpstreamClient,
}

impl AppState {
    /// Creates the application state around an upstream client.
    #[must_use]
    pub const fn new(upstream: UpstreamClient) -> Self {
        Self { upstream }
    }
}
