//! Error types for the tutor runtime.
//!
//! - [`ProviderError`]: the hosted LLM call failed. Shown to the student as
//!   a visible failure message; never retried by the controller.
//! - [`UnknownStageResponse`]: the stage classifier answered with something
//!   that is not a stage id. Recovered locally by falling back to stage 1.
//! - [`TutorError`]: everything a caller of the controller or the
//!   preference panel can see.
//! - [`ConfigError`]: the preference/stage document could not be loaded.

use thiserror::Error;

/// Failure of a single completion request.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// `OPENROUTER_KEY` is not set.
    #[error("OPENROUTER_KEY not set")]
    MissingApiKey,
    /// The request never produced an HTTP response (DNS, TLS, timeout, ...).
    #[error("request failed: {0}")]
    Transport(String),
    /// Non-2xx response from the provider.
    #[error("OpenRouter API HTTP {status}: {body}")]
    Http { status: u16, body: String },
    /// 2xx response that is not a valid completion body.
    #[error("failed to parse response: {0}")]
    Decode(String),
    /// The provider reported an error inside a 2xx body.
    #[error("OpenRouter API error: {0}")]
    Api(String),
    /// The response contained no choices.
    #[error("empty LLM response")]
    EmptyResponse,
}

impl ProviderError {
    /// Whether the failure is a rate limit (HTTP 429).
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Http { status: 429, .. })
    }
}

/// The stage classifier returned a value outside the stage registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised stage response: {raw:?}")]
pub struct UnknownStageResponse {
    pub raw: String,
}

/// Errors surfaced by the conversation controller and preference panel.
#[derive(Debug, Error)]
pub enum TutorError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("unknown preference category: {0}")]
    UnknownPreferenceCategory(String),
    #[error("unknown option {option:?} for preference category {category}")]
    UnknownPreferenceOption { category: String, option: String },
    #[error("message is empty")]
    EmptyInput,
}

/// Errors loading or validating the tutor configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
