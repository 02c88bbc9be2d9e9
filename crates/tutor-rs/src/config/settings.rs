//! Runtime settings with sensible defaults.
//!
//! [`TutorSettings`] captures the knobs a tutor session needs (model,
//! temperatures, prompt budget) and builds the OpenRouter client via
//! [`build_client`](TutorSettings::build_client).

use crate::error::ProviderError;
use crate::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL, OpenRouterClient};

/// Settings for a tutoring session.
#[derive(Debug, Clone)]
pub struct TutorSettings {
    /// Model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,
    /// Maximum tokens per LLM response. Default: `1024`.
    pub max_tokens: u32,
    /// Temperature for the stage classifier. Default: `0.0`.
    pub classify_temperature: f32,
    /// Temperature for the tutor reply. Default: `0.9`.
    pub response_temperature: f32,
    /// Prompt size budget in estimated tokens. Oldest transcript turns are
    /// left out of the prompt once it is exceeded. Default: `12000`.
    pub max_prompt_tokens: usize,
}

impl Default for TutorSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            classify_temperature: 0.0,
            response_temperature: 0.9,
            max_prompt_tokens: 12_000,
        }
    }
}

impl TutorSettings {
    /// Build an [`OpenRouterClient`] for these settings.
    pub fn build_client(
        &self,
        api_key: impl Into<String>,
    ) -> Result<OpenRouterClient, ProviderError> {
        Ok(OpenRouterClient::new(api_key)?
            .with_model(self.model.clone())
            .with_max_tokens(self.max_tokens))
    }
}
