//! Convenience re-exports for common `tutor-rs` types.
//!
//! ```ignore
//! use tutor_rs::prelude::*;
//! ```
//!
//! Pulls in the client, the configuration, the controller and the
//! preference panel. Budget and transcript internals are left out; import
//! those from [`crate::context`] directly.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::api::{CompletionFuture, LlmClient};
pub use crate::{Message, OpenRouterClient};

// ── Configuration ───────────────────────────────────────────────────
pub use crate::config::{
    AgentIdentity, PreferenceCategory, PreferenceOption, PreferenceRegistry, StageDefinition,
    StageId, StageRegistry, TutorConfig, TutorSettings,
};

// ── Conversation ────────────────────────────────────────────────────
pub use crate::agent::{
    ConversationController, ConversationState, PreferencePanel, PreferenceWidget,
    PromptAssembler, StudentPreferences,
};
pub use crate::context::{ConversationTurn, Speaker, Transcript};

// ── Errors ──────────────────────────────────────────────────────────
pub use crate::error::{ConfigError, ProviderError, TutorError};
