use serde::{Deserialize, Serialize};
use std::env;

const DEFAULT_API_URL: &str = "https://api.deepseek.com/chat/completions";
const DEFAULT_MODEL: &str = "deepseek-chat";
const DEFAULT_SYSTEM_PROMPT: &str =
    "Answer with the fewest, most precise words. Give the answer directly, \
     without pleasantries or extra explanation.";

/// Settings for the upstream chat-completion API.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LlmConfig {
    /// Bearer credential for the upstream API. Requests are rejected when
    /// this is unset.
    pub api_key: Option<String>,

    /// Upstream chat-completion endpoint.
    pub api_url: String,

    /// Model identifier sent with every request.
    pub model: String,

    /// Sampling temperature.
    pub temperature: f32,

    /// Maximum completion tokens per response.
    pub max_tokens: u32,

    /// Instruction prepended when the caller supplies no system message.
    pub system_prompt: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl LlmConfig {
    /// Applies `RELAYCHAT_*` environment overrides on top of the current
    /// values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(api_key) = env::var("RELAYCHAT_API_KEY") {
            if !api_key.is_empty() {
                self.api_key = Some(api_key);
            }
        }
        if let Ok(api_url) = env::var("RELAYCHAT_API_URL") {
            self.api_url = api_url;
        }
        if let Ok(model) = env::var("RELAYCHAT_MODEL") {
            self.model = model;
        }
        if let Ok(system_prompt) = env::var("RELAYCHAT_SYSTEM_PROMPT") {
            self.system_prompt = system_prompt;
        }
    }
}
