//! Append-only conversation transcript.
//!
//! Turns are numbered in insertion order and never reordered or removed
//! except by reseeding the session. The prompt renders them one per line,
//! each terminated by [`END_OF_TURN`].

use chrono::Local;
use serde::{Deserialize, Serialize};

/// Marker the model is asked to end each reply with.
pub const END_OF_TURN: &str = "<END_OF_TURN>";

/// Who produced a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Tutor,
}

/// A single turn of the conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub speaker: Speaker,
    pub text: String,
    /// 0-based sequence number within the session.
    pub position: usize,
    /// Local wall-clock time the turn was recorded (`HH:MM:SS`).
    pub at: String,
}

impl ConversationTurn {
    /// The line this turn contributes to a prompt.
    pub fn render(&self, agent_name: &str) -> String {
        let label = match self.speaker {
            Speaker::User => "User",
            Speaker::Tutor => agent_name,
        };
        format!("{label}: {} {END_OF_TURN}", self.text)
    }
}

/// Ordered history of one session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transcript {
    turns: Vec<ConversationTurn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn and return it.
    pub fn push(&mut self, speaker: Speaker, text: impl Into<String>) -> &ConversationTurn {
        let position = self.turns.len();
        self.turns.push(ConversationTurn {
            speaker,
            text: text.into(),
            position,
            at: Local::now().format("%H:%M:%S").to_string(),
        });
        &self.turns[position]
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Whether the student has said anything yet.
    pub fn has_user_turn(&self) -> bool {
        self.turns.iter().any(|t| t.speaker == Speaker::User)
    }

    pub(crate) fn clear(&mut self) {
        self.turns.clear();
    }
}

/// Render turns as the history block of a prompt.
pub fn render_history(turns: &[ConversationTurn], agent_name: &str) -> String {
    turns
        .iter()
        .map(|t| t.render(agent_name))
        .collect::<Vec<_>>()
        .join("\n")
}
