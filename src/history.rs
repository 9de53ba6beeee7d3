// history.rs - Per-user conversation window for the chat fallback
//
// Turns are stored as tagged strings ("User: ..." / "AI: ...") and trimmed to
// the most recent MAX_HISTORY_TURNS on every append. Nothing here is ever
// written to disk.

use serde::{Deserialize, Serialize};

pub const MAX_HISTORY_TURNS: usize = 20;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationHistory {
    turns: Vec<String>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self { turns: Vec::new() }
    }

    pub fn push_user(&mut self, text: &str) {
        self.push(format!("User: {}", text));
    }

    pub fn push_ai(&mut self, text: &str) {
        self.push(format!("AI: {}", text));
    }

    fn push(&mut self, turn: String) {
        self.turns.push(turn);
        // Keep only the trailing window
        if self.turns.len() > MAX_HISTORY_TURNS {
            self.turns.drain(0..self.turns.len() - MAX_HISTORY_TURNS);
        }
    }

    pub fn turns(&self) -> &[String] {
        &self.turns
    }

}
