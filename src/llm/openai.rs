//! ChatGPT provider — OpenAI chat completions, non-streaming.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::llm::llm_config::ProviderSettings;
use crate::llm::provider::{ProviderError, ProviderId, QueryProvider};
use crate::utils::http::request_with_retry;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

pub struct ChatGptProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    system_prompt: String,
}

impl ChatGptProvider {
    pub fn new(settings: &ProviderSettings, system_prompt: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_key: settings.resolve_api_key(),
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
impl QueryProvider for ChatGptProvider {
    fn id(&self) -> ProviderId {
        ProviderId::ChatGpt
    }

    async fn query(&self, prompt: &str) -> Result<String, ProviderError> {
        let api_key = self.api_key.clone().ok_or(ProviderError::MissingKey)?;
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let system = if self.system_prompt.is_empty() {
            DEFAULT_SYSTEM_PROMPT.to_string()
        } else {
            self.system_prompt.clone()
        };
        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
            temperature: 0.7,
        };

        let client = self.client.clone();
        let response = request_with_retry(
            move || {
                let client = client.clone();
                let url = url.clone();
                let body = body.clone();
                let api_key = api_key.clone();
                async move {
                    client
                        .post(&url)
                        .header("Authorization", format!("Bearer {}", api_key))
                        .json(&body)
                        .send()
                        .await
                }
            },
            2,
        )
        .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Api {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::BadResponse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        Ok(content.trim().to_string())
    }
}
