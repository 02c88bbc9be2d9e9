//! Mapping classifier output to a stage.
//!
//! The classifier is a black box. Its answer is trimmed and must be exactly
//! a stage id of the registry; anything else falls back to stage 1.

use tracing::warn;

use crate::config::{StageId, StageRegistry};
use crate::error::UnknownStageResponse;

/// Parse a raw classifier answer.
pub fn parse_stage_response(
    raw: &str,
    stages: &StageRegistry,
) -> Result<StageId, UnknownStageResponse> {
    raw.trim()
        .parse::<u8>()
        .ok()
        .map(StageId::new)
        .filter(|id| stages.contains(*id))
        .ok_or_else(|| UnknownStageResponse {
            raw: raw.to_string(),
        })
}

/// Parse a raw classifier answer, falling back to stage 1.
pub fn resolve_stage(raw: &str, stages: &StageRegistry) -> StageId {
    match parse_stage_response(raw, stages) {
        Ok(id) => id,
        Err(e) => {
            warn!("{e}; falling back to stage {}", StageId::INTRODUCTION);
            StageId::INTRODUCTION
        }
    }
}
