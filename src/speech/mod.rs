//! Speech engine interfaces — synthesis lifecycle events, the synthesizer
//! contract, and transcript events from recognition.
//!
//! Real engines live outside this crate (platform TTS, browser speech
//! APIs). The animation layer only ever sees the three lifecycle signals.

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

// ── Events ─────────────────────────────────────────────

/// Playback lifecycle reported by a synthesizer. `Boundary` marks a
/// word/phoneme transition and is the mouth-motion timing proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisEvent {
    Started,
    Boundary,
    Ended,
}

/// Recognition output. A `Final` transcript is what triggers a new
/// orchestration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    Interim(String),
    Final(String),
}

// ── Errors ─────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("speech synthesis unavailable: {0}")]
    Unavailable(String),
    #[error("synthesis failed: {0}")]
    SynthesisFailed(String),
}

// ── Synthesizer contract ───────────────────────────────

/// Speak `text`, reporting the playback lifecycle on `events`. Resolves
/// once playback has finished or failed. Event delivery must follow
/// `Started`, zero or more `Boundary`, `Ended`.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn speak(
        &self,
        text: &str,
        events: UnboundedSender<SynthesisEvent>,
    ) -> Result<(), SpeechError>;
}

/// Stand-in when no speech engine is present: playback is silently
/// skipped and no events fire. The reply is still delivered as text.
pub struct NullSynthesizer;

#[async_trait]
impl SpeechSynthesizer for NullSynthesizer {
    async fn speak(
        &self,
        _text: &str,
        _events: UnboundedSender<SynthesisEvent>,
    ) -> Result<(), SpeechError> {
        Ok(())
    }
}
