use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf};
use thiserror::Error;

use crate::config::llm::LlmConfig;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";

/// Errors raised while resolving the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path of the unreadable file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be parsed.
    #[error("failed to parse config file {path}: {message}")]
    Parse {
        /// Path of the malformed file.
        path: PathBuf,
        /// Parser diagnostic.
        message: String,
    },

    /// The configuration file extension is not supported.
    #[error("unsupported configuration format; use a .yaml, .yml, or .json file")]
    UnsupportedFormat,

    /// The resolved configuration is invalid.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// The main configuration structure for the `RelayChat` server.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,

    /// Upstream chat-completion API settings.
    pub llm: LlmConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

/// HTTP server settings.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    /// Port for the HTTP server.
    pub port: u16,

    /// Cross-origin settings for the browser client.
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            cors: CorsConfig::default(),
        }
    }
}

/// Cross-origin settings.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins permitted to call the API. Empty means any origin.
    pub allowed_origins: Vec<String>,

    /// Whether credentialed requests are allowed.
    pub allow_credentials: bool,

    /// Preflight cache lifetime.
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![DEFAULT_FRONTEND_URL.to_string()],
            allow_credentials: true,
            max_age_seconds: 3600,
        }
    }
}

/// Logging settings.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Loads the configuration from an optional file, environment
    /// variables, and an optional port override, in that order.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] when the file cannot be read or parsed,
    /// an environment override is malformed, or validation fails.
    pub fn load(
        config_path: Option<PathBuf>,
        port_override: Option<u16>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;

        if let Some(port) = port_override {
            config.server.port = port;
        }

        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => {
                serde_yml::from_str(&content).map_err(|err| ConfigError::Parse {
                    path: path.clone(),
                    message: err.to_string(),
                })
            }
            Some("json") => serde_json::from_str(&content).map_err(|err| ConfigError::Parse {
                path: path.clone(),
                message: err.to_string(),
            }),
            _ => Err(ConfigError::UnsupportedFormat),
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(port) = env::var("RELAYCHAT_SERVER_PORT") {
            self.server.port = port.parse().map_err(|_| {
                ConfigError::Invalid(
                    "RELAYCHAT_SERVER_PORT must be a number between 1 and 65535".to_string(),
                )
            })?;
        }
        if let Ok(level) = env::var("RELAYCHAT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(origins) = env::var("RELAYCHAT_FRONTEND_URLS") {
            self.server.cors.allowed_origins = origins
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect();
        }

        self.llm.apply_env_overrides();
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid(
                "server port must be greater than 0".to_string(),
            ));
        }
        if self.llm.max_tokens == 0 {
            return Err(ConfigError::Invalid(
                "llm.max_tokens must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
