//! Query provider trait — common interface for all text-generation
//! backends the fallback orchestrator can try.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

// ── Provider identity ──────────────────────────────────

/// The closed set of backends. Order of fallback is decided by the
/// orchestrator, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    /// Free public endpoint backed by open-source models.
    HuggingFace,
    ChatGpt,
    Gemini,
    /// Local-network instance.
    Ollama,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::HuggingFace => "huggingface",
            ProviderId::ChatGpt => "chatgpt",
            ProviderId::Gemini => "gemini",
            ProviderId::Ollama => "ollama",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "huggingface" => Some(ProviderId::HuggingFace),
            "chatgpt" => Some(ProviderId::ChatGpt),
            "gemini" => Some(ProviderId::Gemini),
            "ollama" => Some(ProviderId::Ollama),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Errors ─────────────────────────────────────────────

/// Per-provider failure. Always recoverable from the orchestrator's point
/// of view: it is logged and the next provider in order is tried.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("missing API key")]
    MissingKey,
    #[error("empty reply")]
    EmptyReply,
    #[error("canned boilerplate reply")]
    CannedReply,
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed response: {0}")]
    BadResponse(String),
}

// ── Provider trait ─────────────────────────────────────

/// One text-generation backend. Implementations prepend the configured
/// system prompt themselves; the orchestrator only sees prompt in,
/// text out.
#[async_trait]
pub trait QueryProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// One-shot completion for `prompt`.
    async fn query(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Hard deadline the orchestrator should enforce via cancellation.
    /// `None` leaves the bound to the underlying transport.
    fn query_timeout(&self) -> Option<Duration> {
        None
    }
}
