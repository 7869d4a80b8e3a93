//! Response fallback — try providers in a deterministic order until one
//! yields an acceptable reply.
//!
//! Strictly sequential: one provider call in flight at a time, first
//! accepted reply wins, per-provider failures are recorded and skipped.
//! A reply is accepted iff the call succeeded, the trimmed text is
//! non-empty, and it is not the free endpoint's canned boilerplate.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::llm::free::{self, HuggingFaceProvider};
use crate::llm::gemini::GeminiProvider;
use crate::llm::llm_config::LlmConfig;
use crate::llm::ollama::OllamaProvider;
use crate::llm::openai::ChatGptProvider;
use crate::llm::provider::{ProviderError, ProviderId, QueryProvider};

// ── Status events ──────────────────────────────────────

/// Human-readable progress per attempt. Purely observational; dropping
/// these changes nothing about the control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdate {
    Querying(ProviderId),
    Accepted(ProviderId),
    Offline,
}

impl fmt::Display for StatusUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusUpdate::Querying(id) => write!(f, "Querying {}…", id),
            StatusUpdate::Accepted(id) => write!(f, "{} ✓", id),
            StatusUpdate::Offline => f.write_str("Offline"),
        }
    }
}

pub type StatusCallback = Box<dyn Fn(StatusUpdate) + Send + Sync>;

// ── Errors ─────────────────────────────────────────────

/// Terminal outcome of one `resolve` call.
#[derive(Debug, thiserror::Error)]
pub enum FallbackError {
    /// Every provider in the order was tried; `last` is the final failure.
    #[error("all providers failed: {last}")]
    Exhausted {
        #[source]
        last: ProviderError,
    },
    /// Nothing was tried at all (empty order or none registered).
    #[error("no provider succeeded")]
    NoProviders,
    /// A newer request started before this one finished; its reply was
    /// dropped.
    #[error("superseded by a newer request")]
    Superseded,
}

// ── Order ──────────────────────────────────────────────

/// Deterministic fallback order: the fixed base order, with a valid
/// preferred id hoisted to the front. Never contains duplicates.
pub fn provider_order(preferred: Option<ProviderId>, pro_enabled: bool) -> Vec<ProviderId> {
    let mut base = vec![ProviderId::HuggingFace];
    if pro_enabled {
        base.push(ProviderId::ChatGpt);
        base.push(ProviderId::Gemini);
    }
    base.push(ProviderId::Ollama);

    let mut order = Vec::with_capacity(base.len());
    if let Some(id) = preferred {
        if base.contains(&id) {
            order.push(id);
        }
    }
    for id in base {
        if !order.contains(&id) {
            order.push(id);
        }
    }
    order
}

// ── Orchestrator ───────────────────────────────────────

pub struct FallbackOrchestrator {
    providers: Vec<Arc<dyn QueryProvider>>,
    pro_enabled: bool,
    generation: AtomicU64,
    on_status: Option<StatusCallback>,
}

impl FallbackOrchestrator {
    pub fn new(providers: Vec<Arc<dyn QueryProvider>>, pro_enabled: bool) -> Self {
        Self {
            providers,
            pro_enabled,
            generation: AtomicU64::new(0),
            on_status: None,
        }
    }

    /// Build the full provider set from config; pro availability follows
    /// key resolvability.
    pub fn from_config(config: &LlmConfig) -> Self {
        let system = config.system_prompt.as_str();
        let providers: Vec<Arc<dyn QueryProvider>> = vec![
            Arc::new(HuggingFaceProvider::new(&config.huggingface, system)),
            Arc::new(ChatGptProvider::new(&config.chatgpt, system)),
            Arc::new(GeminiProvider::new(&config.gemini, system)),
            Arc::new(OllamaProvider::new(&config.ollama, system)),
        ];
        Self::new(providers, config.pro_enabled())
    }

    pub fn with_status(mut self, callback: impl Fn(StatusUpdate) + Send + Sync + 'static) -> Self {
        self.on_status = Some(Box::new(callback));
        self
    }

    pub fn pro_enabled(&self) -> bool {
        self.pro_enabled
    }

    pub fn order(&self, preferred: Option<ProviderId>) -> Vec<ProviderId> {
        provider_order(preferred, self.pro_enabled)
    }

    fn provider(&self, id: ProviderId) -> Option<&Arc<dyn QueryProvider>> {
        self.providers.iter().find(|p| p.id() == id)
    }

    fn emit(&self, update: StatusUpdate) {
        if let Some(ref callback) = self.on_status {
            callback(update);
        }
    }

    /// Try providers in order and return the first accepted reply.
    ///
    /// A request that is overtaken by a newer `resolve` call finishes with
    /// `FallbackError::Superseded` instead of its (stale) reply.
    pub async fn resolve(
        &self,
        prompt: &str,
        preferred: Option<ProviderId>,
    ) -> Result<String, FallbackError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut last_error: Option<ProviderError> = None;

        for id in self.order(preferred) {
            let Some(provider) = self.provider(id) else {
                continue;
            };
            self.emit(StatusUpdate::Querying(id));

            let attempt = match provider.query_timeout() {
                Some(limit) => match tokio::time::timeout(limit, provider.query(prompt)).await {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::Timeout(limit)),
                },
                None => provider.query(prompt).await,
            };

            match attempt {
                Ok(reply) => {
                    let trimmed = reply.trim();
                    if trimmed.is_empty() {
                        tracing::warn!("[LLM] {} returned an empty reply", id);
                        last_error = Some(ProviderError::EmptyReply);
                        continue;
                    }
                    if free::is_canned_reply(trimmed) {
                        tracing::warn!("[LLM] {} returned the canned boilerplate", id);
                        last_error = Some(ProviderError::CannedReply);
                        continue;
                    }
                    if self.generation.load(Ordering::SeqCst) != generation {
                        tracing::debug!("[LLM] dropping stale reply from {}", id);
                        return Err(FallbackError::Superseded);
                    }
                    self.emit(StatusUpdate::Accepted(id));
                    return Ok(trimmed.to_string());
                }
                Err(e) => {
                    tracing::warn!("[LLM] {} failed: {}", id, e);
                    last_error = Some(e);
                }
            }
        }

        self.emit(StatusUpdate::Offline);
        match last_error {
            Some(last) => Err(FallbackError::Exhausted { last }),
            None => Err(FallbackError::NoProviders),
        }
    }
}
