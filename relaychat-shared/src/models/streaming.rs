use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Normalized event produced by the stream decoder.
///
/// At most one terminal event ([`StreamEvent::Done`] or
/// [`StreamEvent::Error`]) ends a given request's event sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental assistant text.
    Content(String),
    /// The upstream stream finished normally.
    Done,
    /// The stream failed; carries a user-facing message.
    Error(String),
}

/// One downstream wire frame, serialized as the payload of a
/// `data: <JSON>` line.
///
/// Exactly three shapes occur: `{"content":...,"done":false}`,
/// `{"done":true}`, and `{"error":...,"done":true}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct StreamFrame {
    /// Incremental assistant text, present on content frames only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// User-facing failure message, present on error frames only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Whether this frame terminates the stream.
    #[serde(default)]
    pub done: bool,
}

impl StreamFrame {
    /// A content frame carrying one text fragment.
    #[must_use]
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            error: None,
            done: false,
        }
    }

    /// The successful terminal frame.
    #[must_use]
    pub const fn done() -> Self {
        Self {
            content: None,
            error: None,
            done: true,
        }
    }

    /// A failing terminal frame.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: None,
            error: Some(message.into()),
            done: true,
        }
    }
}

impl From<StreamEvent> for StreamFrame {
    fn from(event: StreamEvent) -> Self {
        match event {
            StreamEvent::Content(text) => Self::content(text),
            StreamEvent::Done => Self::done(),
            StreamEvent::Error(message) => Self::error(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_frame_serializes_without_error_field() {
        let frame = StreamFrame::content("He");
        let json = serde_json::to_string(&frame).unwrap();

        assert_eq!(json, r#"{"content":"He","done":false}"#);
    }

    #[test]
    fn done_frame_serializes_to_done_only() {
        let json = serde_json::to_string(&StreamFrame::done()).unwrap();

        assert_eq!(json, r#"{"done":true}"#);
    }

    #[test]
    fn error_frame_carries_message_and_done() {
        let frame = StreamFrame::error("stream interrupted");
        let json = serde_json::to_string(&frame).unwrap();

        assert_eq!(json, r#"{"error":"stream interrupted","done":true}"#);
    }

    #[test]
    fn frame_round_trips_through_json() {
        for frame in [
            StreamFrame::content("fragment"),
            StreamFrame::done(),
            StreamFrame::error("boom"),
        ] {
            let json = serde_json::to_string(&frame).unwrap();
            let parsed: StreamFrame = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, frame);
        }
    }

    #[test]
    fn frame_from_event_maps_all_variants() {
        assert_eq!(
            StreamFrame::from(StreamEvent::Content("hi".into())),
            StreamFrame::content("hi")
        );
        assert_eq!(StreamFrame::from(StreamEvent::Done), StreamFrame::done());
        assert_eq!(
            StreamFrame::from(StreamEvent::Error("bad".into())),
            StreamFrame::error("bad")
        );
    }
}
