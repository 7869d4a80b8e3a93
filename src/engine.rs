//! AvatarEngine — glue between an accepted reply, the conversation
//! history, and speech synthesis.
//!
//! The engine never touches the animation session directly: synthesis
//! events flow over the channel handed in at construction, and the frame
//! loop drains them into `AvatarSession::speech_event`.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;

use crate::history::{ConversationHistory, Role, Turn};
use crate::llm::fallback::{FallbackError, FallbackOrchestrator};
use crate::llm::provider::ProviderId;
use crate::speech::{SpeechSynthesizer, SynthesisEvent, TranscriptEvent};

pub const WELCOME_MESSAGE: &str = "Hello! I am your AI avatar. Ask me anything.";
pub const ALL_UNAVAILABLE_MESSAGE: &str =
    "All models unavailable right now. Please try again later.";

pub struct AvatarEngine {
    orchestrator: FallbackOrchestrator,
    history: Mutex<ConversationHistory>,
    history_path: Option<PathBuf>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    speech_events: UnboundedSender<SynthesisEvent>,
}

impl AvatarEngine {
    pub fn new(
        orchestrator: FallbackOrchestrator,
        history: ConversationHistory,
        history_path: Option<PathBuf>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        speech_events: UnboundedSender<SynthesisEvent>,
    ) -> Self {
        Self {
            orchestrator,
            history: Mutex::new(history),
            history_path,
            synthesizer,
            speech_events,
        }
    }

    pub fn orchestrator(&self) -> &FallbackOrchestrator {
        &self.orchestrator
    }

    /// Seed the greeting turn and speak it.
    pub async fn welcome(&self) {
        self.append(Role::Assistant, WELCOME_MESSAGE).await;
        self.speak(WELCOME_MESSAGE).await;
    }

    /// Resolve `prompt` through the fallback order; on success the reply
    /// is appended to history and handed to the synthesizer.
    pub async fn ask(
        &self,
        prompt: &str,
        preferred: Option<ProviderId>,
    ) -> Result<String, FallbackError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Ok(String::new());
        }

        self.append(Role::User, prompt).await;

        match self.orchestrator.resolve(prompt, preferred).await {
            Ok(reply) => {
                self.append(Role::Assistant, &reply).await;
                self.speak(&reply).await;
                Ok(reply)
            }
            // A stale request leaves no trace; the newer one owns the turn
            Err(FallbackError::Superseded) => Err(FallbackError::Superseded),
            Err(e) => {
                self.append(Role::Assistant, ALL_UNAVAILABLE_MESSAGE).await;
                Err(e)
            }
        }
    }

    /// Recognition input: a final transcript triggers a new request,
    /// interim transcripts are display-only.
    pub async fn on_transcript(
        &self,
        event: TranscriptEvent,
        preferred: Option<ProviderId>,
    ) -> Option<Result<String, FallbackError>> {
        match event {
            TranscriptEvent::Interim(_) => None,
            TranscriptEvent::Final(text) => Some(self.ask(&text, preferred).await),
        }
    }

    pub async fn history_snapshot(&self) -> Vec<Turn> {
        self.history.lock().await.turns().to_vec()
    }

    async fn append(&self, role: Role, content: &str) {
        let mut history = self.history.lock().await;
        history.push(role, content);
        if let Some(ref path) = self.history_path {
            if let Err(e) = history.save(path) {
                tracing::warn!("[Engine] failed to persist history: {}", e);
            }
        }
    }

    async fn speak(&self, text: &str) {
        // An unavailable engine skips playback; the text reply stands
        if let Err(e) = self.synthesizer.speak(text, self.speech_events.clone()).await {
            tracing::warn!("[Engine] speech synthesis skipped: {}", e);
        }
    }
}
