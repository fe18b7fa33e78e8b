#![cfg_attr(not(test), forbid(unsafe_code))]

//! Main entry point for the `RelayChat` proxy server.

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use shared::config::server::Config;
use std::error::Error;
use std::path::PathBuf;

mod app_state;
mod handlers;
mod http;
mod openapi;
mod routes;
mod server;
mod services;
mod tracer;

/// Main CLI structure for the `RelayChat` server.
#[derive(Parser)]
#[command(name = "RelayChat server")]
#[command(about = "Streaming chat proxy for RelayChat", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands for the `RelayChat` server.
#[derive(Subcommand)]
pub enum Commands {
    /// Start the proxy server
    Serve {
        /// The port number to bind the server to (e.g., 8080)
        #[arg(long, short)]
        port: Option<u16>,

        /// Path to the configuration file (config.yaml or config.json)
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
}

/// Initializes environment variables and returns the parsed CLI.
#[must_use]
pub fn initialize_cli() -> Cli {
    dotenv().ok();
    Cli::parse()
}

/// Handles the serve command by loading configuration and starting the server.
///
/// # Errors
/// Returns an error if configuration loading or server startup fails.
pub async fn handle_serve_command(
    port: Option<u16>,
    config: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let resolved_config = Config::load(config, port)?;
    server::run(resolved_config).await?;
    Ok(())
}

/// Main application entry point.
///
/// # Errors
/// Returns an error if the application fails to initialize or run.
pub async fn run_app() -> Result<(), Box<dyn Error>> {
    let cli = initialize_cli();

    match cli.command {
        Commands::Serve { port, config } => {
            handle_serve_command(port, config).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    run_app().await
}
