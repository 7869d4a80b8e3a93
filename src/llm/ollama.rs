//! Ollama provider — local llama via `/api/generate`, non-streaming.
//!
//! No client-side timeout here: the orchestrator enforces the hard 15 s
//! deadline via cancellation, which treats a hung local daemon the same
//! as any other provider failure.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::llm::llm_config::ProviderSettings;
use crate::llm::provider::{ProviderError, ProviderId, QueryProvider};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.1";
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    system_prompt: String,
}

impl OllamaProvider {
    pub fn new(settings: &ProviderSettings, system_prompt: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: settings
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            system_prompt: system_prompt.to_string(),
        }
    }
}

#[async_trait]
impl QueryProvider for OllamaProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Ollama
    }

    fn query_timeout(&self) -> Option<Duration> {
        Some(QUERY_TIMEOUT)
    }

    async fn query(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
        let full_prompt = if self.system_prompt.is_empty() {
            prompt.to_string()
        } else {
            format!("{}\n\n{}", self.system_prompt, prompt)
        };
        let body = GenerateRequest {
            model: self.model.clone(),
            prompt: full_prompt,
            system: (!self.system_prompt.is_empty()).then(|| self.system_prompt.clone()),
            stream: false,
        };

        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            return Err(ProviderError::Api {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::BadResponse(e.to_string()))?;

        Ok(parsed.response.unwrap_or_default())
    }
}
