pub mod chat;
pub mod conversations;
