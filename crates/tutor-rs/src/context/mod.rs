//! Conversation history and prompt-size management.
//!
//! - [`transcript`]: the append-only [`Transcript`] of one session.
//! - [`budget`]: [`PromptBudget`], which windows the transcript so prompts
//!   stay under a configured size.

pub mod budget;
pub mod transcript;

pub use budget::{PromptBudget, PromptUsage};
pub use transcript::{ConversationTurn, END_OF_TURN, Speaker, Transcript, render_history};
