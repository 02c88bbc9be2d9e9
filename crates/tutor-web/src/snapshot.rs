//! Serializable projections for WebSocket and REST transport.
//!
//! [`SessionSnapshot`] is everything the page needs to render a session:
//! the current stage, the chat bubbles in transcript order, and one
//! single-choice widget per preference category. [`ConfigSnapshot`] is the
//! session-independent registry view served at `/api/config`.

use serde::Serialize;
use tutor_rs::agent::PreferenceWidget;
use tutor_rs::config::{PreferenceRegistry, StageId, TutorConfig};
use tutor_rs::context::{ConversationTurn, Speaker};
use uuid::Uuid;

use crate::session::Session;

/// One chat bubble.
#[derive(Clone, Debug, Serialize)]
pub struct Bubble {
    pub position: usize,
    pub speaker: Speaker,
    /// Display name: `"User"` or the agent's name.
    pub label: String,
    pub text: String,
    /// Local wall-clock time the turn was recorded, `HH:MM:SS`.
    pub at: String,
    pub is_user: bool,
}

impl Bubble {
    pub fn from_turn(turn: &ConversationTurn, agent_name: &str) -> Self {
        let is_user = turn.speaker == Speaker::User;
        Self {
            position: turn.position,
            speaker: turn.speaker,
            label: if is_user { "User" } else { agent_name }.to_string(),
            text: turn.text.clone(),
            at: turn.at.clone(),
            is_user,
        }
    }
}

/// A stage id with its name.
#[derive(Clone, Debug, Serialize)]
pub struct StageSummary {
    pub id: StageId,
    pub name: String,
}

/// Serializable view of a [`Session`].
#[derive(Debug, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub agent_name: String,
    pub stage: StageSummary,
    pub bubbles: Vec<Bubble>,
    pub preferences: Vec<PreferenceWidget>,
}

impl SessionSnapshot {
    pub fn from_session(session: &Session) -> Self {
        let controller = session.controller();
        let agent_name = controller.config().agent.name.clone();
        let stage = controller.stage();

        let bubbles = controller
            .transcript()
            .turns()
            .iter()
            .map(|t| Bubble::from_turn(t, &agent_name))
            .collect();

        Self {
            session_id: session.id(),
            stage: StageSummary {
                id: stage.id,
                name: stage.name.clone(),
            },
            bubbles,
            preferences: session.panel().widgets(),
            agent_name,
        }
    }
}

/// Registry view: agent name, stages and preference categories.
#[derive(Debug, Serialize)]
pub struct ConfigSnapshot<'a> {
    pub agent_name: &'a str,
    pub stages: Vec<StageSummary>,
    pub categories: &'a PreferenceRegistry,
}

impl<'a> ConfigSnapshot<'a> {
    pub fn from_config(config: &'a TutorConfig) -> Self {
        Self {
            agent_name: &config.agent.name,
            stages: config
                .stages
                .iter()
                .map(|s| StageSummary {
                    id: s.id,
                    name: s.name.clone(),
                })
                .collect(),
            categories: &config.personalization,
        }
    }
}
