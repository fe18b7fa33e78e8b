use anyhow::{Context, Result, anyhow};
use uuid::Uuid;

use crate::store::ConversationStore;

pub fn handle_list() -> Result<()> {
    let store = ConversationStore::load_or_seed(ConversationStore::storage_dir())?;

    if store.conversations().is_empty() {
        println!("No conversations stored.");
        return Ok(());
    }

    for conversation in store.conversations() {
        let marker = if store.active_id() == Some(conversation.id) {
            "*"
        } else {
            "-"
        };
        println!(
            "{marker} {} \"{}\" messages={} updated={}",
            conversation.id,
            conversation.title,
            conversation.messages.len(),
            conversation.updated_at,
        );
    }

    Ok(())
}

pub fn handle_new() -> Result<()> {
    let mut store = ConversationStore::load_or_seed(ConversationStore::storage_dir())?;
    let conversation = store.create_conversation()?;

    println!(
        "Created conversation {} (\"{}\")",
        conversation.id, conversation.title
    );
    Ok(())
}

pub fn handle_switch(id: Uuid) -> Result<()> {
    let mut store = ConversationStore::load_or_seed(ConversationStore::storage_dir())?;
    store.switch_active(id)?;

    println!("Active conversation is now {id}");
    Ok(())
}

pub fn handle_delete(id: Uuid) -> Result<()> {
    let mut store = ConversationStore::load_or_seed(ConversationStore::storage_dir())?;
    if store.get(id).is_none() {
        return Err(anyhow!("no conversation with id {id}"));
    }
    store.delete_conversation(id)?;

    match store.active_id() {
        Some(next) => println!("Deleted {id}; active conversation is now {next}"),
        None => println!("Deleted {id}; no conversations remain"),
    }
    Ok(())
}

pub fn handle_show(id: Option<Uuid>) -> Result<()> {
    let store = ConversationStore::load_or_seed(ConversationStore::storage_dir())?;

    let conversation = match id {
        Some(id) => store
            .get(id)
            .ok_or_else(|| anyhow!("no conversation with id {id}"))?,
        None => store.active().context("no active conversation")?,
    };

    println!(
        "Conversation \"{}\" ({}, created {})",
        conversation.title, conversation.id, conversation.created_at
    );
    for message in &conversation.messages {
        println!(
            "[{}] {}: {}",
            message.timestamp, message.role, message.content
        );
    }

    Ok(())
}
