pub mod anim;
pub mod config;
pub mod engine;
pub mod history;
pub mod llm;
pub mod rig;
pub mod speech;
pub mod utils;

pub use anim::session::{AvatarSession, AvatarState};
pub use engine::AvatarEngine;
pub use llm::fallback::{FallbackError, FallbackOrchestrator, StatusUpdate};
pub use llm::provider::{ProviderError, ProviderId, QueryProvider};
pub use speech::{SpeechSynthesizer, SynthesisEvent, TranscriptEvent};
