use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;
use uuid::Uuid;

use super::Timestamp;

/// The role of a message author within a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Instruction message steering the assistant.
    System,
    /// Message written by the user.
    User,
    /// Message produced by the assistant.
    Assistant,
}

impl Display for MessageRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single message stored in a conversation.
///
/// `content` grows in place while the assistant reply is streaming and is
/// immutable once the stream terminates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct Message {
    /// Unique identifier for the message.
    pub id: Uuid,

    /// Who authored the message.
    pub role: MessageRole,

    /// The message text.
    pub content: String,

    /// When the message was created.
    pub timestamp: Timestamp,
}

impl Message {
    /// Creates a message with a fresh identifier and the current timestamp.
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Timestamp::now(),
        }
    }
}

/// Wire form of a message: what travels in chat requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct ChatMessage {
    /// Who authored the message.
    pub role: MessageRole,
    /// The message text.
    pub content: String,
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Request body for `POST /api/chat`: the full history of the conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct ChatRequest {
    /// Ordered message history, oldest first.
    pub messages: Vec<ChatMessage>,
}
