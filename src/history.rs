//! Conversation history — the last five turns, persisted as JSON.
//!
//! The surrounding app reads this at startup and appends on every turn;
//! accepted replies from the orchestrator are exactly what lands here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const HISTORY_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Missing or corrupt files yield an empty history.
    pub fn load(path: &Path) -> Self {
        crate::config::load_json_config(path, "History")
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        crate::config::save_json_config(path, self, "History")
    }

    /// Append a turn, dropping the oldest beyond the five-turn cap.
    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.turns.push(Turn {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        });
        while self.turns.len() > HISTORY_LIMIT {
            self.turns.remove(0);
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
