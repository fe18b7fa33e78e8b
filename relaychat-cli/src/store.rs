//! Durable conversation storage.
//!
//! Conversations live as two keyed JSON entries under the user's config
//! directory: the full ordered collection, and the active conversation id.
//! Every mutation rewrites both entries, so the on-disk state always
//! matches the in-memory state.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use chrono::Duration;
use directories::BaseDirs;
use shared::models::{Conversation, Message, MessageRole, Timestamp};
use uuid::Uuid;

/// Canned assistant greeting seeded into every new conversation.
pub const GREETING: &str = "Hello! I'm your AI chat assistant. How can I help you today?";

const CONVERSATIONS_FILE: &str = "conversations.json";
const ACTIVE_FILE: &str = "active_conversation.json";

/// Ordered collection of conversations plus the active pointer.
///
/// Conversations are kept most-recently-created first. The active id, when
/// set, always references an existing conversation.
#[derive(Debug)]
pub struct ConversationStore {
    dir: PathBuf,
    conversations: Vec<Conversation>,
    active_id: Option<Uuid>,
}

impl ConversationStore {
    /// Default storage directory under the user's config dir.
    #[must_use]
    pub fn storage_dir() -> PathBuf {
        BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("relaychat"))
            .unwrap_or_else(|| PathBuf::from("./relaychat"))
    }

    /// Loads the store from `dir`, falling back to a single freshly seeded
    /// conversation when storage is empty or unreadable. Deserialization
    /// failures never fail startup.
    ///
    /// # Errors
    /// Fails only when the resolved state cannot be written back.
    pub fn load_or_seed(dir: PathBuf) -> Result<Self> {
        let conversations = read_json::<Vec<Conversation>>(&dir.join(CONVERSATIONS_FILE))
            .filter(|conversations| !conversations.is_empty())
            .unwrap_or_else(|| vec![seed_conversation()]);

        let active_id = read_json::<Option<Uuid>>(&dir.join(ACTIVE_FILE)).flatten();

        let mut store = Self {
            dir,
            conversations,
            active_id,
        };

        // A stale pointer fails over to the first conversation.
        if !store.active_exists() {
            store.active_id = store.conversations.first().map(|conversation| conversation.id);
        }

        store.persist()?;
        Ok(store)
    }

    /// All conversations, most recently created first.
    #[must_use]
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// The active conversation id, if any.
    #[must_use]
    pub const fn active_id(&self) -> Option<Uuid> {
        self.active_id
    }

    /// The active conversation, if any.
    #[must_use]
    pub fn active(&self) -> Option<&Conversation> {
        self.active_id.and_then(|id| self.get(id))
    }

    /// Looks up a conversation by id.
    #[must_use]
    pub fn get(&self, conversation_id: Uuid) -> Option<&Conversation> {
        self.conversations
            .iter()
            .find(|conversation| conversation.id == conversation_id)
    }

    /// Prepends a freshly seeded conversation, makes it active, and returns
    /// it so the caller can capture its id immediately.
    ///
    /// # Errors
    /// Fails when the new state cannot be persisted.
    pub fn create_conversation(&mut self) -> Result<Conversation> {
        let conversation = seed_conversation();
        self.conversations.insert(0, conversation.clone());
        self.active_id = Some(conversation.id);
        self.persist()?;
        Ok(conversation)
    }

    /// Replaces a conversation's message sequence wholesale, recomputing
    /// its title and bumping `updated_at`. Unknown ids are a no-op, but the
    /// store is still persisted; this must not fail mid-stream.
    ///
    /// # Errors
    /// Fails when the new state cannot be persisted.
    pub fn update_messages(&mut self, conversation_id: Uuid, messages: Vec<Message>) -> Result<()> {
        if let Some(conversation) = self
            .conversations
            .iter_mut()
            .find(|conversation| conversation.id == conversation_id)
        {
            conversation.title = Conversation::title_from(&messages);
            conversation.messages = messages;
            conversation.updated_at = next_instant(conversation.updated_at);
        }
        self.persist()
    }

    /// Removes a conversation. When it was active, activates the first
    /// remaining conversation, or clears the pointer if none remain.
    ///
    /// # Errors
    /// Fails when the new state cannot be persisted.
    pub fn delete_conversation(&mut self, conversation_id: Uuid) -> Result<()> {
        self.conversations
            .retain(|conversation| conversation.id != conversation_id);

        if self.active_id == Some(conversation_id) {
            self.active_id = self.conversations.first().map(|conversation| conversation.id);
        }

        self.persist()
    }

    /// Reassigns the active pointer without touching any messages.
    ///
    /// # Errors
    /// Fails when the id is unknown or the new state cannot be persisted.
    pub fn switch_active(&mut self, conversation_id: Uuid) -> Result<()> {
        if self.get(conversation_id).is_none() {
            bail!("no conversation with id {conversation_id}");
        }
        self.active_id = Some(conversation_id);
        self.persist()
    }

    fn active_exists(&self) -> bool {
        self.active_id.is_some_and(|id| self.get(id).is_some())
    }

    fn persist(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).with_context(|| {
            format!("failed to create storage directory {}", self.dir.display())
        })?;

        let conversations = serde_json::to_string(&self.conversations)
            .context("failed to serialize conversations")?;
        fs::write(self.dir.join(CONVERSATIONS_FILE), conversations)
            .context("failed to write conversation storage")?;

        let active =
            serde_json::to_string(&self.active_id).context("failed to serialize active id")?;
        fs::write(self.dir.join(ACTIVE_FILE), active)
            .context("failed to write active-conversation storage")?;

        Ok(())
    }
}

fn seed_conversation() -> Conversation {
    Conversation::new(vec![Message::new(MessageRole::Assistant, GREETING)])
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

/// A strictly-later instant than `previous`: the invariant holds even when
/// two mutations land within the clock's resolution.
fn next_instant(previous: Timestamp) -> Timestamp {
    let now = Timestamp::now();
    if now > previous {
        now
    } else {
        Timestamp(previous.0 + Duration::microseconds(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::conversation::DEFAULT_TITLE;

    fn temp_store() -> (tempfile::TempDir, ConversationStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ConversationStore::load_or_seed(dir.path().to_path_buf()).unwrap();
        (dir, store)
    }

    #[test]
    fn empty_storage_is_seeded_with_a_greeting_conversation() {
        let (_dir, store) = temp_store();

        assert_eq!(store.conversations().len(), 1);
        let seeded = &store.conversations()[0];
        assert_eq!(seeded.title, DEFAULT_TITLE);
        assert_eq!(seeded.messages.len(), 1);
        assert_eq!(seeded.messages[0].role, MessageRole::Assistant);
        assert_eq!(seeded.messages[0].content, GREETING);
        assert_eq!(store.active_id(), Some(seeded.id));
    }

    #[test]
    fn corrupt_storage_falls_back_to_a_seeded_conversation() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONVERSATIONS_FILE), b"{definitely not json").unwrap();
        fs::write(dir.path().join(ACTIVE_FILE), b"also broken").unwrap();

        let store = ConversationStore::load_or_seed(dir.path().to_path_buf()).unwrap();

        assert_eq!(store.conversations().len(), 1);
        assert!(store.active().is_some());
    }

    #[test]
    fn create_conversation_prepends_and_activates() {
        let (_dir, mut store) = temp_store();
        let first_id = store.conversations()[0].id;

        let created = store.create_conversation().unwrap();

        assert_eq!(store.conversations().len(), 2);
        assert_eq!(store.conversations()[0].id, created.id);
        assert_eq!(store.conversations()[1].id, first_id);
        assert_eq!(store.active_id(), Some(created.id));
    }

    #[test]
    fn update_messages_recomputes_title_and_bumps_updated_at() {
        let (_dir, mut store) = temp_store();
        let conversation = store.active().unwrap().clone();

        let mut messages = conversation.messages.clone();
        messages.push(Message::new(
            MessageRole::User,
            "What is the weather like today in Paris",
        ));
        store.update_messages(conversation.id, messages).unwrap();

        let updated = store.get(conversation.id).unwrap();
        assert_eq!(updated.title.chars().count(), 20);
        assert_eq!(updated.title, "What is the weather ");
        assert!(updated.updated_at > conversation.updated_at);
    }

    #[test]
    fn updated_at_strictly_increases_across_rapid_mutations() {
        let (_dir, mut store) = temp_store();
        let id = store.active().unwrap().id;

        let mut previous = store.get(id).unwrap().updated_at;
        for round in 0..5 {
            let messages = vec![Message::new(MessageRole::User, format!("round {round}"))];
            store.update_messages(id, messages).unwrap();
            let current = store.get(id).unwrap().updated_at;
            assert!(current > previous);
            previous = current;
        }
    }

    #[test]
    fn update_messages_with_unknown_id_is_a_quiet_no_op() {
        let (_dir, mut store) = temp_store();
        let before = store.conversations().to_vec();

        store
            .update_messages(Uuid::new_v4(), vec![Message::new(MessageRole::User, "hi")])
            .unwrap();

        assert_eq!(store.conversations(), &before[..]);
    }

    #[test]
    fn deleting_the_active_conversation_fails_over_to_the_first_remaining() {
        let (_dir, mut store) = temp_store();
        store.create_conversation().unwrap();
        let newest = store.create_conversation().unwrap();
        assert_eq!(store.conversations().len(), 3);
        assert_eq!(store.active_id(), Some(newest.id));

        store.delete_conversation(newest.id).unwrap();

        assert_eq!(store.conversations().len(), 2);
        let expected = store.conversations()[0].id;
        assert_eq!(store.active_id(), Some(expected));
    }

    #[test]
    fn deleting_the_last_conversation_clears_the_active_pointer() {
        let (_dir, mut store) = temp_store();
        let only = store.active().unwrap().id;

        store.delete_conversation(only).unwrap();

        assert!(store.conversations().is_empty());
        assert_eq!(store.active_id(), None);
    }

    #[test]
    fn deleting_an_inactive_conversation_keeps_the_active_pointer() {
        let (_dir, mut store) = temp_store();
        let old = store.active().unwrap().id;
        let newest = store.create_conversation().unwrap();

        store.delete_conversation(old).unwrap();

        assert_eq!(store.active_id(), Some(newest.id));
    }

    #[test]
    fn switch_active_reassigns_the_pointer() {
        let (_dir, mut store) = temp_store();
        let old = store.active().unwrap().id;
        store.create_conversation().unwrap();

        store.switch_active(old).unwrap();

        assert_eq!(store.active_id(), Some(old));
    }

    #[test]
    fn switch_active_rejects_unknown_ids() {
        let (_dir, mut store) = temp_store();

        assert!(store.switch_active(Uuid::new_v4()).is_err());
    }

    #[test]
    fn mutations_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();

        let created = {
            let mut store = ConversationStore::load_or_seed(dir.path().to_path_buf()).unwrap();
            let created = store.create_conversation().unwrap();
            store
                .update_messages(
                    created.id,
                    vec![Message::new(MessageRole::User, "persist me")],
                )
                .unwrap();
            created
        };

        let reloaded = ConversationStore::load_or_seed(dir.path().to_path_buf()).unwrap();

        assert_eq!(reloaded.active_id(), Some(created.id));
        let conversation = reloaded.get(created.id).unwrap();
        assert_eq!(conversation.title, "persist me");
        assert_eq!(conversation.messages[0].content, "persist me");
    }

    #[test]
    fn stale_active_pointer_fails_over_on_load() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = ConversationStore::load_or_seed(dir.path().to_path_buf()).unwrap();
            drop(store);
        }
        // Point the active entry at a conversation that does not exist.
        fs::write(
            dir.path().join(ACTIVE_FILE),
            serde_json::to_string(&Some(Uuid::new_v4())).unwrap(),
        )
        .unwrap();

        let store = ConversationStore::load_or_seed(dir.path().to_path_buf()).unwrap();

        assert_eq!(
            store.active_id(),
            Some(store.conversations()[0].id),
            "active pointer should fail over to the first conversation"
        );
    }
}
