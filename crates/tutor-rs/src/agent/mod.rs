//! The tutoring loop and its supporting pieces.
//!
//! - [`controller::ConversationController`] runs a turn: classify the stage,
//!   then generate the reply. Start here.
//! - [`assembler::PromptAssembler`] builds both prompts from the config.
//! - [`stage`] maps classifier output to a [`StageId`](crate::config::StageId).
//! - [`preferences::PreferencePanel`] edits the student's selections.
//! - [`prompt::SystemPromptBuilder`] for multi-section prompt assembly.

pub mod assembler;
pub mod controller;
pub mod preferences;
pub mod prompt;
pub mod stage;

pub use assembler::PromptAssembler;
pub use controller::{ConversationController, ConversationState};
pub use preferences::{PreferencePanel, PreferenceWidget, StudentPreferences};
pub use prompt::SystemPromptBuilder;
pub use stage::{parse_stage_response, resolve_stage};
