//! Append-only transcript of conversation turns.

use std::sync::Mutex;

use medway_core::types::{Turn, TurnAuthor, TurnKind};
use medway_providers::ChatMessage;

/// Ordered log of turns for one session.
///
/// Interactive-prompt turns carry empty text and are excluded from the
/// history fed back into classifier/analyzer calls, so UI-selector labels
/// never pollute model context.
#[derive(Debug, Default)]
pub struct TranscriptStore {
    turns: Mutex<Vec<Turn>>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user-authored text turn.
    pub fn push_user(&self, text: impl Into<String>) -> Turn {
        self.push(Turn::text(TurnAuthor::User, text))
    }

    /// Append a system-authored text turn.
    pub fn push_system(&self, text: impl Into<String>) -> Turn {
        self.push(Turn::text(TurnAuthor::System, text))
    }

    /// Append a system-authored interactive prompt turn.
    pub fn push_prompt(&self, kind: TurnKind) -> Turn {
        self.push(Turn::prompt(kind))
    }

    /// All turns in insertion order.
    pub fn turns(&self) -> Vec<Turn> {
        self.turns.lock().expect("turns mutex poisoned").clone()
    }

    /// The most recent turn, if any.
    pub fn last(&self) -> Option<Turn> {
        self.turns
            .lock()
            .expect("turns mutex poisoned")
            .last()
            .cloned()
    }

    /// Trimmed history for model calls: the last `limit` text turns, with
    /// prompt turns excluded.
    pub fn context_messages(&self, limit: usize) -> Vec<ChatMessage> {
        let turns = self.turns.lock().expect("turns mutex poisoned");
        let mut messages: Vec<ChatMessage> = turns
            .iter()
            .filter(|t| !t.kind.is_prompt())
            .map(|t| ChatMessage {
                role: match t.author {
                    TurnAuthor::User => "user".to_string(),
                    TurnAuthor::System => "system".to_string(),
                },
                content: t.text.clone(),
            })
            .collect();
        if messages.len() > limit {
            messages.drain(..messages.len() - limit);
        }
        messages
    }

    /// Remove all turns (session reset).
    pub fn clear(&self) {
        self.turns.lock().expect("turns mutex poisoned").clear();
    }

    fn push(&self, turn: Turn) -> Turn {
        self.turns
            .lock()
            .expect("turns mutex poisoned")
            .push(turn.clone());
        turn
    }
}

// =============================================================================
// Tests
// =============================================================================
