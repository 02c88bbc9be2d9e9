//! Tutor configuration: registries, agent identity, runtime settings.
//!
//! The configuration document is JSON with four top-level keys:
//!
//! ```json
//! {
//!   "agent": { "name": "Larry", "role": "AI-powered Tutor", ... },
//!   "rules": ["The AI tutor must ...", ...],
//!   "stages": [{ "id": 1, "name": "Introduction", "instruction": "..." }, ...],
//!   "personalization": [{ "id": "depth", "title": "Depth Level", "options": [...] }, ...]
//! }
//! ```
//!
//! A default document is compiled into the crate ([`TutorConfig::builtin`]);
//! binaries accept `--config <path>` to load another one. Either way the
//! result is validated once and shared read-only as `Arc<TutorConfig>`.

pub mod registry;
pub mod settings;

pub use registry::{
    PreferenceCategory, PreferenceOption, PreferenceRegistry, StageDefinition, StageId,
    StageRegistry,
};
pub use settings::TutorSettings;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// The configuration document compiled into the crate.
pub const BUILTIN_CONFIG: &str = include_str!("../../config/tutor.json");

/// Persistent identity of the tutor agent, injected into every response prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentIdentity {
    pub name: String,
    pub role: String,
    pub company_name: String,
    pub company_business: String,
    pub company_values: String,
    pub conversation_purpose: String,
    /// Medium of the conversation, e.g. `"message"`.
    pub conversation_type: String,
    #[serde(default = "default_true")]
    pub use_emojis: bool,
}

fn default_true() -> bool {
    true
}

/// Complete, validated tutor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorConfig {
    pub agent: AgentIdentity,
    /// Behavioural rules, rendered as a numbered list.
    pub rules: Vec<String>,
    pub stages: StageRegistry,
    pub personalization: PreferenceRegistry,
}

impl TutorConfig {
    /// Parse and validate the compiled-in document.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json(BUILTIN_CONFIG)
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: TutorConfig = serde_json::from_str(json)?;
        config.validate()?;
        debug!(
            "Loaded tutor config: {} stages, {} preference categories, {} rules",
            config.stages.len(),
            config.personalization.len(),
            config.rules.len()
        );
        Ok(config)
    }

    /// Read, parse and validate a document from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Load from `path` if given, otherwise use the built-in document.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Self::builtin(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.name.trim().is_empty() {
            return Err(ConfigError::Invalid("agent name is empty".into()));
        }
        self.stages.validate()?;
        self.personalization.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_config_is_valid() {
        let config = TutorConfig::builtin().unwrap();
        assert_eq!(config.agent.name, "Larry");
        assert_eq!(config.stages.len(), 10);
        assert_eq!(config.personalization.len(), 6);
        assert_eq!(config.rules.len(), 15);
    }

    #[test]
    fn builtin_stage_four_is_config() {
        let config = TutorConfig::builtin().unwrap();
        let stage = config.stages.get(StageId::new(4)).unwrap();
        assert_eq!(stage.name, "config");
        assert!(stage.instruction.starts_with("config:"));
    }

    #[test]
    fn builtin_options_keep_document_order() {
        let config = TutorConfig::builtin().unwrap();
        let depth = config.personalization.get("depth").unwrap();
        assert_eq!(depth.options.len(), 10);
        assert_eq!(depth.options[0].label, "Surface level");
        assert_eq!(depth.options[9].label, "Cutting-edge research");
        let styles = config.personalization.get("learning_style").unwrap();
        assert_eq!(styles.options[1].label, "Visual");
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(BUILTIN_CONFIG.as_bytes()).unwrap();
        let config = TutorConfig::load(file.path()).unwrap();
        assert_eq!(config.stages.introduction().name, "Introduction");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = TutorConfig::load("/nonexistent/tutor.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/tutor.json"));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = TutorConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn out_of_order_stages_rejected() {
        let mut doc: serde_json::Value = serde_json::from_str(BUILTIN_CONFIG).unwrap();
        doc["stages"][0]["id"] = serde_json::json!(5);
        let err = TutorConfig::from_json(&doc.to_string()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
