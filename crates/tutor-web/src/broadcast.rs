//! Messages pushed from a session to its WebSocket clients.
//!
//! Each [`Session`](crate::session::Session) owns a
//! `tokio::sync::broadcast` channel of [`WsMessage`] values. REST and
//! WebSocket handlers both go through the session, so every connected tab
//! sees the same stream regardless of where a turn was submitted.

use serde::Serialize;
use tutor_rs::config::StageId;

use crate::snapshot::Bubble;

/// A message sent from the server to WebSocket clients.
///
/// Discriminated on the `type` field when serialized to JSON.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// Full session snapshot (sent on connect, after preference changes and
    /// after a lagging client resynchronizes).
    Snapshot { data: serde_json::Value },
    /// The student's message was recorded.
    UserMessage { bubble: Bubble },
    /// The tutor replied.
    TutorMessage { bubble: Bubble },
    /// Stage selected for the latest tutor turn.
    Stage { id: StageId, name: String },
    /// A turn or selection failed. The failure is shown to the student.
    Error { message: String },
}
