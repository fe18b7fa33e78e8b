use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::Args;
use shared::models::{ChatMessage, Message, MessageRole};
use tokio_util::sync::CancellationToken;

use crate::{
    client::{ChatClient, StreamOutcome},
    store::ConversationStore,
};

#[derive(Args, Debug)]
#[command(about = "Start an interactive chat session in the active conversation")]
pub struct ChatArgs {
    /// `RelayChat` server base URL (default: <http://localhost:8080>)
    #[arg(long, default_value = "http://localhost:8080")]
    pub server: String,
}

#[derive(Args, Debug)]
#[command(about = "Send one message and stream the reply")]
pub struct SendArgs {
    /// Message text to send
    #[arg()]
    pub text: String,

    /// `RelayChat` server base URL (default: <http://localhost:8080>)
    #[arg(long, default_value = "http://localhost:8080")]
    pub server: String,
}

pub async fn handle_chat(args: ChatArgs) -> Result<()> {
    let client = ChatClient::new(&args.server)?;
    let mut store = ConversationStore::load_or_seed(ConversationStore::storage_dir())?;
    ensure_active(&mut store)?;

    {
        let conversation = store.active().context("no active conversation")?;
        println!(
            "Conversation \"{}\" ({})",
            conversation.title, conversation.id
        );
        for message in &conversation.messages {
            render_message(message);
        }
    }
    println!("Type a message and press Enter. Ctrl+C stops a streaming reply; Ctrl+D exits.");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // Ctrl+D
            println!();
            break;
        }
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        send_and_stream(&client, &mut store, text).await?;
    }

    Ok(())
}

pub async fn handle_send(args: SendArgs) -> Result<()> {
    let client = ChatClient::new(&args.server)?;
    let mut store = ConversationStore::load_or_seed(ConversationStore::storage_dir())?;
    ensure_active(&mut store)?;

    send_and_stream(&client, &mut store, &args.text).await
}

fn ensure_active(store: &mut ConversationStore) -> Result<()> {
    if store.active().is_none() {
        store.create_conversation()?;
    }
    Ok(())
}

/// Sends one user message in the active conversation and streams the reply
/// into its trailing assistant message.
///
/// The conversation id is captured before the request starts, and every
/// mutation addresses that id: switching the active conversation while the
/// reply is still streaming cannot redirect it.
async fn send_and_stream(
    client: &ChatClient,
    store: &mut ConversationStore,
    text: &str,
) -> Result<()> {
    let conversation = store.active().context("no active conversation")?;
    let conversation_id = conversation.id;

    let mut messages = conversation.messages.clone();
    messages.push(Message::new(MessageRole::User, text));
    let history: Vec<ChatMessage> = messages.iter().map(ChatMessage::from).collect();

    // Placeholder that fills in as deltas arrive.
    messages.push(Message::new(MessageRole::Assistant, ""));
    store.update_messages(conversation_id, messages.clone())?;

    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.cancel();
        }
    });

    let mut accumulated = String::new();
    let outcome = client
        .send_message(&history, &cancel, |chunk| {
            accumulated.push_str(chunk);
            print!("{chunk}");
            let _ = io::stdout().flush();

            let mut streamed = messages.clone();
            if let Some(reply) = streamed.last_mut() {
                reply.content = accumulated.clone();
            }
            // A persistence hiccup mid-stream is retried by the final update.
            let _ = store.update_messages(conversation_id, streamed);
        })
        .await;
    ctrl_c.abort();
    let outcome = outcome?;

    if let Some(reply) = messages.last_mut() {
        reply.content = match &outcome {
            StreamOutcome::Completed | StreamOutcome::Cancelled => accumulated.clone(),
            StreamOutcome::Failed(error) => format!("Sorry, an error occurred: {error}"),
        };
    }

    println!();
    match &outcome {
        StreamOutcome::Cancelled => println!("[stopped]"),
        StreamOutcome::Failed(error) => eprintln!("error: {error}"),
        StreamOutcome::Completed => {}
    }

    store.update_messages(conversation_id, messages)?;
    Ok(())
}

fn render_message(message: &Message) {
    println!(
        "[{}] {}: {}",
        message.timestamp, message.role, message.content
    );
}
