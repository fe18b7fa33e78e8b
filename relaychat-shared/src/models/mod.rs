//! Data and wire models shared by the server and the client.

pub mod conversation;
pub mod errors;
pub mod message;
pub mod streaming;
pub mod timestamp;

pub use conversation::Conversation;
pub use errors::ErrorResponse;
pub use message::{ChatMessage, ChatRequest, Message, MessageRole};
pub use streaming::{StreamEvent, StreamFrame};
pub use timestamp::Timestamp;
