use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{Message, MessageRole, Timestamp};

/// Fallback title for conversations with no user message yet.
pub const DEFAULT_TITLE: &str = "New conversation";

/// Maximum number of characters carried into a derived title.
pub const TITLE_MAX_CHARS: usize = 20;

/// An independent chat thread: an ordered message history plus metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct Conversation {
    /// Unique identifier for the conversation.
    pub id: Uuid,

    /// Short label shown in conversation lists, derived from the first
    /// user message.
    pub title: String,

    /// The messages in this conversation, oldest first.
    pub messages: Vec<Message>,

    /// When the conversation was created.
    pub created_at: Timestamp,

    /// When the message set was last mutated. Strictly increases on
    /// every mutation.
    pub updated_at: Timestamp,
}

impl Conversation {
    /// Creates a conversation seeded with the given messages.
    #[must_use]
    pub fn new(messages: Vec<Message>) -> Self {
        let now = Timestamp::now();
        Self {
            id: Uuid::new_v4(),
            title: Self::title_from(&messages),
            messages,
            created_at: now,
            updated_at: now,
        }
    }

    /// Derives a title from the first user message: its first
    /// [`TITLE_MAX_CHARS`] characters, or [`DEFAULT_TITLE`] when there is
    /// no non-empty user message.
    #[must_use]
    pub fn title_from(messages: &[Message]) -> String {
        messages
            .iter()
            .find(|message| message.role == MessageRole::User)
            .map(|message| message.content.chars().take(TITLE_MAX_CHARS).collect::<String>())
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_conversation_uses_default_title() {
        let conversation = Conversation::new(vec![Message::new(
            MessageRole::Assistant,
            "Hello! How can I help?",
        )]);

        assert_eq!(conversation.title, DEFAULT_TITLE);
        assert!(!conversation.id.is_nil());
        assert_eq!(conversation.created_at, conversation.updated_at);
    }

    #[test]
    fn test_title_from_short_user_message() {
        let messages = vec![
            Message::new(MessageRole::Assistant, "greeting"),
            Message::new(MessageRole::User, "weather?"),
        ];

        assert_eq!(Conversation::title_from(&messages), "weather?");
    }

    #[test]
    fn test_title_truncates_to_twenty_chars() {
        let messages = vec![Message::new(
            MessageRole::User,
            "What is the weather like today in Paris",
        )];

        let title = Conversation::title_from(&messages);
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS);
        assert_eq!(title, "What is the weather ");
    }

    #[test]
    fn test_title_counts_characters_not_bytes() {
        let messages = vec![Message::new(
            MessageRole::User,
            "héllo wörld with ûmlauts galore",
        )];

        assert_eq!(
            Conversation::title_from(&messages).chars().count(),
            TITLE_MAX_CHARS
        );
    }

    #[test]
    fn test_title_falls_back_when_user_message_is_empty() {
        let messages = vec![Message::new(MessageRole::User, "")];

        assert_eq!(Conversation::title_from(&messages), DEFAULT_TITLE);
    }

    #[test]
    fn test_conversation_serialization_round_trip() {
        let conversation = Conversation::new(vec![Message::new(MessageRole::User, "hi")]);

        let serialized = serde_json::to_string(&conversation).unwrap();
        let deserialized: Conversation = serde_json::from_str(&serialized).unwrap();

        assert_eq!(deserialized, conversation);
    }
}
