use axum::{Json, http::StatusCode, response::IntoResponse};
use shared::models::ErrorResponse;
use thiserror::Error;

/// Result alias for request handlers.
pub type AppResult<T> = Result<T, ApiError>;

/// A request failure that renders as a conventional JSON error body.
///
/// Only used before a stream response has begun; once the event stream is
/// committed, failures travel as terminal frames instead.
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Creates an error with an explicit status and machine-readable code.
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// A `400 Bad Request` for malformed input.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_request", message)
    }

    /// A `500 Internal Server Error`.
    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(ErrorResponse::new(self.message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::CONTENT_TYPE;
    use serde_json::Value;

    #[test]
    fn new_sets_fields() {
        let error = ApiError::bad_request("messages must not be empty");

        assert_eq!(error.status, StatusCode::BAD_REQUEST);
        assert_eq!(error.code, "invalid_request");
        assert_eq!(error.message, "messages must not be empty");
    }

    #[tokio::test]
    async fn into_response_serializes_error_body() {
        let response = ApiError::internal_server_error("upstream API key is not set")
            .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let bytes = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .expect("body to bytes");
        let json: Value = serde_json::from_slice(&bytes).expect("error body deserializes");
        assert_eq!(json["error"], "upstream API key is not set");
    }
}
