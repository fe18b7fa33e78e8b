use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Conventional JSON error body returned before a stream begins.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, ToSchema)]
pub struct ErrorResponse {
    /// The user-facing error message.
    pub error: String,
}

impl ErrorResponse {
    /// Creates an error response with the given message.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_serialization() {
        let error = ErrorResponse::new("missing credential");
        let json = serde_json::to_string(&error).unwrap();

        assert_eq!(json, r#"{"error":"missing credential"}"#);
    }

    #[test]
    fn test_error_response_display() {
        assert_eq!(ErrorResponse::new("boom").to_string(), "boom");
    }
}
