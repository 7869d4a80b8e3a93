//! Free public endpoint provider — open-source models behind a plain GET,
//! no key required. Replies need sanitizing: some frontends wrap them in
//! quotes, escape newlines, or lead with a canned self-introduction.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use std::sync::OnceLock;
use std::time::Duration;

use crate::llm::llm_config::ProviderSettings;
use crate::llm::provider::{ProviderError, ProviderId, QueryProvider};
use crate::utils::http::request_with_retry;

const DEFAULT_BASE_URL: &str = "https://text.pollinations.ai";
const DEFAULT_MODEL: &str = "llama3.1";

/// The boilerplate self-introduction the free endpoint sometimes leads
/// with. Stripped when followed by real content; a reply that is nothing
/// but this signature gets rejected by the orchestrator.
fn canned_preamble() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^Ah, Llama 3\.1[\s\S]*?!\s*").expect("static pattern"))
}

fn canned_signature() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^Ah, Llama 3\.1").expect("static pattern"))
}

/// True when the trimmed reply is still the canned self-introduction.
pub(crate) fn is_canned_reply(text: &str) -> bool {
    canned_signature().is_match(text)
}

pub struct HuggingFaceProvider {
    client: Client,
    base_url: String,
    model: String,
    system_prompt: String,
}

impl HuggingFaceProvider {
    pub fn new(settings: &ProviderSettings, system_prompt: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
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

    /// Strip wrapping quotes, unescape newlines, drop the canned preamble.
    fn sanitize(text: &str) -> String {
        let mut out = text.trim();
        if let Some(stripped) = out.strip_prefix('"') {
            out = stripped;
        }
        if let Some(stripped) = out.strip_suffix('"') {
            out = stripped;
        }
        let out = out.replace("\\n", "\n");
        canned_preamble().replace(&out, "").into_owned()
    }
}

#[async_trait]
impl QueryProvider for HuggingFaceProvider {
    fn id(&self) -> ProviderId {
        ProviderId::HuggingFace
    }

    async fn query(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), self.model);
        let full = self.full_prompt(prompt);
        let seed: u32 = rand::random::<u32>() % 1_000_000_000;

        let client = self.client.clone();
        let response = request_with_retry(
            move || {
                let client = client.clone();
                let url = url.clone();
                let full = full.clone();
                async move {
                    client
                        .get(&url)
                        .query(&[
                            ("prompt", full.as_str()),
                            ("temperature", "0.8"),
                            ("top_p", "0.9"),
                            ("length", "300"),
                            ("seed", &seed.to_string()),
                        ])
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

        let text = response.text().await?;
        Ok(Self::sanitize(&text))
    }
}
