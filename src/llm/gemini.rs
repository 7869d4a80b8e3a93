//! Gemini provider — `generateContent` over the Generative Language API.
//! Gemini has no separate system role on this endpoint, so the system
//! prompt is prepended to the user text.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::llm::llm_config::ProviderSettings;
use crate::llm::provider::{ProviderError, ProviderId, QueryProvider};
use crate::utils::http::request_with_retry;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";

#[derive(Debug, Clone, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

pub struct GeminiProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    system_prompt: String,
}

impl GeminiProvider {
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

    fn full_prompt(&self, prompt: &str) -> String {
        if self.system_prompt.is_empty() {
            prompt.to_string()
        } else {
            format!("{}\n\n{}", self.system_prompt, prompt)
        }
    }
}

#[async_trait]
impl QueryProvider for GeminiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Gemini
    }

    async fn query(&self, prompt: &str) -> Result<String, ProviderError> {
        let api_key = self.api_key.clone().ok_or(ProviderError::MissingKey)?;
        let url = format!(
            "{}/v1/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );

        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: self.full_prompt(prompt),
                }],
            }],
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
                        .query(&[("key", api_key.as_str())])
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

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::BadResponse(e.to_string()))?;

        let content = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .unwrap_or_default();
        Ok(content.trim().to_string())
    }
}
