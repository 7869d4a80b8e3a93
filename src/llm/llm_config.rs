//! Provider configuration — persisted to `llm_config.json`.

use crate::config;
use crate::llm::provider::ProviderId;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Connection settings for one backend. Keys resolve from the direct
/// field first, then the named environment variable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

impl ProviderSettings {
    pub fn resolve_api_key(&self) -> Option<String> {
        config::resolve_api_key(&self.api_key, &self.api_key_env)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Prepended to every prompt when non-empty.
    #[serde(default)]
    pub system_prompt: String,

    /// Preferred provider id, hoisted to the front of the fallback order
    /// when it is part of the base order.
    #[serde(default)]
    pub preferred: Option<String>,

    #[serde(default = "default_huggingface")]
    pub huggingface: ProviderSettings,
    #[serde(default = "default_chatgpt")]
    pub chatgpt: ProviderSettings,
    #[serde(default = "default_gemini")]
    pub gemini: ProviderSettings,
    #[serde(default = "default_ollama")]
    pub ollama: ProviderSettings,
}

fn default_huggingface() -> ProviderSettings {
    ProviderSettings {
        api_key: None,
        api_key_env: None,
        base_url: Some("https://text.pollinations.ai".to_string()),
        model: Some("llama3.1".to_string()),
    }
}

fn default_chatgpt() -> ProviderSettings {
    ProviderSettings {
        api_key: None,
        api_key_env: Some("OPENAI_API_KEY".to_string()),
        base_url: Some("https://api.openai.com/v1".to_string()),
        model: Some("gpt-4o-mini".to_string()),
    }
}

fn default_gemini() -> ProviderSettings {
    ProviderSettings {
        api_key: None,
        api_key_env: Some("GEMINI_API_KEY".to_string()),
        base_url: Some("https://generativelanguage.googleapis.com".to_string()),
        model: Some("gemini-1.5-flash-latest".to_string()),
    }
}

fn default_ollama() -> ProviderSettings {
    ProviderSettings {
        api_key: None,
        api_key_env: None,
        base_url: Some("http://localhost:11434".to_string()),
        model: Some("llama3.1".to_string()),
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            system_prompt: String::new(),
            preferred: None,
            huggingface: default_huggingface(),
            chatgpt: default_chatgpt(),
            gemini: default_gemini(),
            ollama: default_ollama(),
        }
    }
}

impl LlmConfig {
    /// Pro backends join the fallback order iff at least one of their keys
    /// resolves — the health-probe rule.
    pub fn pro_enabled(&self) -> bool {
        self.chatgpt.resolve_api_key().is_some() || self.gemini.resolve_api_key().is_some()
    }

    pub fn preferred_id(&self) -> Option<ProviderId> {
        self.preferred.as_deref().and_then(ProviderId::parse)
    }
}

pub fn load_config(path: &Path) -> LlmConfig {
    config::load_json_config(path, "LLM")
}

pub fn save_config(path: &Path, config: &LlmConfig) -> Result<(), String> {
    config::save_json_config(path, config, "LLM")
}
