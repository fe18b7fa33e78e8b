//! # Configuration
//!
//! Server, upstream-LLM, and logging settings, resolved from defaults, an
//! optional YAML/JSON file, environment variables, and CLI overrides.

pub mod llm;
pub mod server;

pub use llm::LlmConfig;
pub use server::{Config, ConfigError, CorsConfig, LoggingConfig, ServerConfig};
