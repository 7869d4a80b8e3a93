//! Fallback orchestration tests.
//!
//! Stub providers cover ordering, validation and the stale-request policy;
//! wiremock covers each HTTP provider's wire format end to end.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::fallback::{FallbackError, FallbackOrchestrator, StatusUpdate};
use super::free::HuggingFaceProvider;
use super::gemini::GeminiProvider;
use super::llm_config::ProviderSettings;
use super::ollama::OllamaProvider;
use super::openai::ChatGptProvider;
use super::provider::{ProviderError, ProviderId, QueryProvider};

// ── Stub provider ──────────────────────────────────────────

struct StubProvider {
    id: ProviderId,
    reply: Result<String, String>,
    delay: Option<Duration>,
    timeout: Option<Duration>,
    calls: AtomicUsize,
}

impl StubProvider {
    fn ok(id: ProviderId, reply: &str) -> Arc<Self> {
        Arc::new(Self {
            id,
            reply: Ok(reply.to_string()),
            delay: None,
            timeout: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(id: ProviderId, message: &str) -> Arc<Self> {
        Arc::new(Self {
            id,
            reply: Err(message.to_string()),
            delay: None,
            timeout: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn slow(id: ProviderId, reply: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            id,
            reply: Ok(reply.to_string()),
            delay: Some(delay),
            timeout: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn with_timeout(mut self: Arc<Self>, timeout: Duration) -> Arc<Self> {
        Arc::get_mut(&mut self).expect("unshared").timeout = Some(timeout);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryProvider for StubProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn query_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn query(&self, _prompt: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.reply {
            Ok(reply) => Ok(reply.clone()),
            Err(message) => Err(ProviderError::Api {
                status: 502,
                body: message.clone(),
            }),
        }
    }
}

fn orchestrator(
    providers: Vec<Arc<dyn QueryProvider>>,
    pro_enabled: bool,
) -> FallbackOrchestrator {
    init_tracing();
    FallbackOrchestrator::new(providers, pro_enabled)
}

/// Route per-attempt warnings into the test output.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ── Ordering scenarios ─────────────────────────────────────

#[tokio::test]
async fn preferred_provider_wins_without_touching_the_local_one() {
    // Pro mode on, chatgpt broken, gemini preferred and healthy
    let free = StubProvider::failing(ProviderId::HuggingFace, "free down");
    let chatgpt = StubProvider::failing(ProviderId::ChatGpt, "quota exceeded");
    let gemini = StubProvider::ok(ProviderId::Gemini, "Paris");
    let ollama = StubProvider::ok(ProviderId::Ollama, "should never run");

    let orch = orchestrator(
        vec![
            free.clone() as Arc<dyn QueryProvider>,
            chatgpt.clone() as Arc<dyn QueryProvider>,
            gemini.clone() as Arc<dyn QueryProvider>,
            ollama.clone() as Arc<dyn QueryProvider>,
        ],
        true,
    );

    let reply = orch
        .resolve("capital of France?", Some(ProviderId::Gemini))
        .await
        .unwrap();
    assert_eq!(reply, "Paris");
    assert_eq!(gemini.calls(), 1);
    assert_eq!(ollama.calls(), 0, "local provider must not be called");
}

#[tokio::test]
async fn failures_advance_through_the_order_to_the_preferred_less_winner() {
    let free = StubProvider::failing(ProviderId::HuggingFace, "free down");
    let chatgpt = StubProvider::failing(ProviderId::ChatGpt, "quota exceeded");
    let gemini = StubProvider::ok(ProviderId::Gemini, "Paris");
    let ollama = StubProvider::ok(ProviderId::Ollama, "should never run");

    let orch = orchestrator(
        vec![
            free.clone() as Arc<dyn QueryProvider>,
            chatgpt.clone() as Arc<dyn QueryProvider>,
            gemini.clone() as Arc<dyn QueryProvider>,
            ollama.clone() as Arc<dyn QueryProvider>,
        ],
        true,
    );

    let reply = orch.resolve("capital of France?", None).await.unwrap();
    assert_eq!(reply, "Paris");
    assert_eq!(free.calls(), 1);
    assert_eq!(chatgpt.calls(), 1);
    assert_eq!(ollama.calls(), 0);
}

#[tokio::test]
async fn disabled_pro_excludes_the_preferred_remote_entirely() {
    let free = StubProvider::ok(ProviderId::HuggingFace, "free reply");
    let chatgpt = StubProvider::ok(ProviderId::ChatGpt, "pro reply");
    let ollama = StubProvider::ok(ProviderId::Ollama, "local reply");

    let orch = orchestrator(
        vec![
            free.clone() as Arc<dyn QueryProvider>,
            chatgpt.clone() as Arc<dyn QueryProvider>,
            ollama.clone() as Arc<dyn QueryProvider>,
        ],
        false,
    );

    let reply = orch
        .resolve("hello", Some(ProviderId::ChatGpt))
        .await
        .unwrap();
    assert_eq!(reply, "free reply", "free provider is tried first");
    assert_eq!(chatgpt.calls(), 0, "chatgpt is not in the base order");
}

// ── Validation ─────────────────────────────────────────────

#[tokio::test]
async fn canned_boilerplate_falls_through_to_the_next_provider() {
    let free = StubProvider::ok(
        ProviderId::HuggingFace,
        "Ah, Llama 3.1 here, your friendly open-source assistant",
    );
    let ollama = StubProvider::ok(ProviderId::Ollama, "A real answer.");

    let orch = orchestrator(
        vec![
            free.clone() as Arc<dyn QueryProvider>,
            ollama.clone() as Arc<dyn QueryProvider>,
        ],
        false,
    );

    let reply = orch.resolve("hello", None).await.unwrap();
    assert_eq!(reply, "A real answer.");
    assert_eq!(free.calls(), 1);
}

#[tokio::test]
async fn whitespace_only_replies_are_rejected() {
    let free = StubProvider::ok(ProviderId::HuggingFace, "   \n  ");
    let ollama = StubProvider::ok(ProviderId::Ollama, "text");

    let orch = orchestrator(
        vec![
            free as Arc<dyn QueryProvider>,
            ollama as Arc<dyn QueryProvider>,
        ],
        false,
    );
    assert_eq!(orch.resolve("hi", None).await.unwrap(), "text");
}

#[tokio::test]
async fn exhaustion_reports_the_last_underlying_failure() {
    let free = StubProvider::failing(ProviderId::HuggingFace, "free down");
    let ollama = StubProvider::failing(ProviderId::Ollama, "connection refused");

    let orch = orchestrator(
        vec![
            free as Arc<dyn QueryProvider>,
            ollama as Arc<dyn QueryProvider>,
        ],
        false,
    );

    let err = orch.resolve("hi", None).await.unwrap_err();
    match err {
        FallbackError::Exhausted { last } => {
            assert!(last.to_string().contains("connection refused"));
        }
        other => panic!("expected Exhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn empty_provider_set_reports_no_providers() {
    let orch = orchestrator(Vec::new(), true);
    let err = orch.resolve("hi", None).await.unwrap_err();
    assert!(matches!(err, FallbackError::NoProviders));
    assert_eq!(err.to_string(), "no provider succeeded");
}

// ── Timeout & staleness ────────────────────────────────────

#[tokio::test]
async fn provider_timeout_cancels_and_advances() {
    let slow = StubProvider::slow(
        ProviderId::HuggingFace,
        "too late",
        Duration::from_millis(300),
    )
    .with_timeout(Duration::from_millis(50));
    let ollama = StubProvider::ok(ProviderId::Ollama, "fast answer");

    let orch = orchestrator(
        vec![
            slow.clone() as Arc<dyn QueryProvider>,
            ollama as Arc<dyn QueryProvider>,
        ],
        false,
    );

    let reply = orch.resolve("hi", None).await.unwrap();
    assert_eq!(reply, "fast answer");
    assert_eq!(slow.calls(), 1);
}

#[tokio::test]
async fn overtaken_request_resolves_as_superseded() {
    let slow = StubProvider::slow(
        ProviderId::HuggingFace,
        "stale reply",
        Duration::from_millis(200),
    );
    let orch = Arc::new(orchestrator(vec![slow as Arc<dyn QueryProvider>], false));

    let first = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.resolve("first", None).await })
    };
    // Let the first request get in flight, then overtake it
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = orch.resolve("second", None).await;

    let first = first.await.unwrap();
    assert!(matches!(first, Err(FallbackError::Superseded)));
    assert_eq!(second.unwrap(), "stale reply"); // newest request keeps its reply
}

// ── Status side-channel ────────────────────────────────────

#[tokio::test]
async fn status_updates_trace_each_attempt() {
    let free = StubProvider::failing(ProviderId::HuggingFace, "down");
    let ollama = StubProvider::ok(ProviderId::Ollama, "ok");

    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let orch = orchestrator(
        vec![
            free as Arc<dyn QueryProvider>,
            ollama as Arc<dyn QueryProvider>,
        ],
        false,
    )
    .with_status(move |update| sink.lock().unwrap().push(update.to_string()));

    orch.resolve("hi", None).await.unwrap();
    assert_eq!(
        seen.lock().unwrap().as_slice(),
        &[
            "Querying huggingface…".to_string(),
            "Querying ollama…".to_string(),
            "ollama ✓".to_string(),
        ]
    );
}

#[tokio::test]
async fn exhaustion_ends_with_offline_status() {
    let free = StubProvider::failing(ProviderId::HuggingFace, "down");

    let seen: Arc<Mutex<Vec<StatusUpdate>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let orch = orchestrator(vec![free as Arc<dyn QueryProvider>], false)
        .with_status(move |update| sink.lock().unwrap().push(update));

    let _ = orch.resolve("hi", None).await;
    assert_eq!(seen.lock().unwrap().last(), Some(&StatusUpdate::Offline));
}

// ── HTTP providers against wiremock ────────────────────────

fn settings(base_url: &str) -> ProviderSettings {
    ProviderSettings {
        api_key: None,
        api_key_env: None,
        base_url: Some(base_url.to_string()),
        model: None,
    }
}

fn keyed_settings(base_url: &str, key: &str) -> ProviderSettings {
    ProviderSettings {
        api_key: Some(key.to_string()),
        api_key_env: None,
        base_url: Some(base_url.to_string()),
        model: None,
    }
}

#[tokio::test]
async fn huggingface_provider_sanitizes_the_raw_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/llama3.1"))
        .and(query_param("temperature", "0.8"))
        .respond_with(ResponseTemplate::new(200).set_body_string("\"Bonjour!\\nParis.\""))
        .mount(&server)
        .await;

    let provider = HuggingFaceProvider::new(&settings(&server.uri()), "Be brief.");
    let reply = provider.query("capital of France?").await.unwrap();
    assert_eq!(reply, "Bonjour!\nParis.");
}

#[tokio::test]
async fn huggingface_provider_surfaces_http_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/llama3.1"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let provider = HuggingFaceProvider::new(&settings(&server.uri()), "");
    let err = provider.query("hello").await.unwrap_err();
    assert!(matches!(err, ProviderError::Api { status: 404, .. }));
}

#[tokio::test]
async fn chatgpt_provider_sends_bearer_auth_and_reads_the_first_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-4o-mini"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "  Paris.  " } }]
        })))
        .mount(&server)
        .await;

    let provider = ChatGptProvider::new(&keyed_settings(&server.uri(), "sk-test"), "");
    let reply = provider.query("capital of France?").await.unwrap();
    assert_eq!(reply, "Paris.");
}

#[tokio::test]
async fn chatgpt_provider_without_a_key_fails_fast() {
    let provider = ChatGptProvider::new(&settings("http://127.0.0.1:1"), "");
    let err = provider.query("hello").await.unwrap_err();
    assert!(matches!(err, ProviderError::MissingKey));
}

#[tokio::test]
async fn gemini_provider_reads_the_first_candidate_part() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/models/gemini-1.5-flash-latest:generateContent"))
        .and(query_param("key", "gm-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Paris." }] }
            }]
        })))
        .mount(&server)
        .await;

    let provider = GeminiProvider::new(&keyed_settings(&server.uri(), "gm-test"), "Be brief.");
    let reply = provider.query("capital of France?").await.unwrap();
    assert_eq!(reply, "Paris.");
}

#[tokio::test]
async fn gemini_provider_treats_missing_candidates_as_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/models/gemini-1.5-flash-latest:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let provider = GeminiProvider::new(&keyed_settings(&server.uri(), "gm-test"), "");
    let reply = provider.query("hello").await.unwrap();
    assert!(reply.is_empty(), "empty reply is the orchestrator's problem");
}

#[tokio::test]
async fn ollama_provider_posts_generate_with_system_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(serde_json::json!({
            "model": "llama3.1",
            "system": "Stay in character.",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "model": "llama3.1",
            "response": "Paris.",
            "done": true
        })))
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(&settings(&server.uri()), "Stay in character.");
    let reply = provider.query("capital of France?").await.unwrap();
    assert_eq!(reply, "Paris.");
    assert_eq!(provider.query_timeout(), Some(Duration::from_secs(15)));
}

#[tokio::test]
async fn full_order_over_http_free_rejected_then_local_accepted() {
    let server = MockServer::start().await;
    // Free endpoint returns pure boilerplate — must be rejected
    Mock::given(method("GET"))
        .and(path("/llama3.1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("Ah, Llama 3.1 speaking, how nice"),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": "The capital of France is Paris."
        })))
        .mount(&server)
        .await;

    let providers: Vec<Arc<dyn QueryProvider>> = vec![
        Arc::new(HuggingFaceProvider::new(&settings(&server.uri()), "")),
        Arc::new(OllamaProvider::new(&settings(&server.uri()), "")),
    ];
    let orch = FallbackOrchestrator::new(providers, false);

    let reply = orch.resolve("capital of France?", None).await.unwrap();
    assert_eq!(reply, "The capital of France is Paris.");
}
