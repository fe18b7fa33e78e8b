#![cfg_attr(not(test), forbid(unsafe_code))]

//! Main entry point for the `RelayChat` command-line client.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use dotenv::dotenv;
use uuid::Uuid;

mod client;
mod commands;
mod store;

/// `RelayChat` CLI
#[derive(Parser)]
#[command(name = "relaychat")]
#[command(about = "Command-line client for RelayChat", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Subcommands for the `RelayChat` CLI
#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session in the active conversation
    Chat(commands::chat::ChatArgs),

    /// Send a single message and stream the reply
    Send(commands::chat::SendArgs),

    /// List stored conversations
    List,

    /// Create a new conversation and make it active
    New,

    /// Make another conversation active
    Switch {
        /// Conversation identifier to activate
        #[arg(long)]
        id: Uuid,
    },

    /// Delete a conversation
    Delete {
        /// Conversation identifier to delete
        #[arg(long)]
        id: Uuid,
    },

    /// Show the messages of a conversation
    Show {
        /// Conversation identifier (defaults to the active conversation)
        #[arg(long)]
        id: Option<Uuid>,
    },

    /// Generate shell completion scripts for the CLI
    Completion {
        /// The shell type for which to generate the completion script
        /// (e.g., bash, zsh, fish, powershell)
        #[arg(long, short)]
        shell: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Chat(args) => commands::chat::handle_chat(args).await,
        Commands::Send(args) => commands::chat::handle_send(args).await,
        Commands::List => commands::conversations::handle_list(),
        Commands::New => commands::conversations::handle_new(),
        Commands::Switch { id } => commands::conversations::handle_switch(id),
        Commands::Delete { id } => commands::conversations::handle_delete(id),
        Commands::Show { id } => commands::conversations::handle_show(id),
        Commands::Completion { shell } => {
            let shell = shell
                .parse::<clap_complete::Shell>()
                .map_err(|_| anyhow::anyhow!("invalid shell type: {shell}"))?;
            clap_complete::generate(shell, &mut Cli::command(), "relaychat", &mut std::io::stdout());
            Ok(())
        }
    }
}
