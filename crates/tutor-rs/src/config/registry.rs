//! Preference and stage registries.
//!
//! Both are ordered lists deserialized from the configuration document and
//! immutable afterwards. Order matters: it is the order options appear in
//! the preference panel and the order stages are listed to the classifier.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ── Stages ────────────────────────────────────────────────────────────

/// Identifier of a conversation stage (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageId(u8);

impl StageId {
    /// The introduction stage. Initial state and fallback for every
    /// unrecognised classifier answer.
    pub const INTRODUCTION: StageId = StageId(1);

    pub fn new(id: u8) -> Self {
        Self(id)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A conversation stage and the tutor behaviour it asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDefinition {
    pub id: StageId,
    /// Short name, e.g. `"config"`.
    pub name: String,
    /// Instruction text injected into the response prompt.
    pub instruction: String,
}

/// Ordered stage table. Ids are exactly `1..=len()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageRegistry {
    stages: Vec<StageDefinition>,
}

impl StageRegistry {
    pub fn new(stages: Vec<StageDefinition>) -> Result<Self, ConfigError> {
        let registry = Self { stages };
        registry.validate()?;
        Ok(registry)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.stages.is_empty() {
            return Err(ConfigError::Invalid("no conversation stages defined".into()));
        }
        for (idx, stage) in self.stages.iter().enumerate() {
            let expected = idx + 1;
            if usize::from(stage.id.get()) != expected {
                return Err(ConfigError::Invalid(format!(
                    "stage ids must be 1..={} in order; found {} at position {expected}",
                    self.stages.len(),
                    stage.id
                )));
            }
            if stage.instruction.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "stage {} has an empty instruction",
                    stage.id
                )));
            }
        }
        Ok(())
    }

    pub fn get(&self, id: StageId) -> Option<&StageDefinition> {
        let idx = usize::from(id.get()).checked_sub(1)?;
        self.stages.get(idx)
    }

    /// Whether `id` is a key of this registry.
    pub fn contains(&self, id: StageId) -> bool {
        self.get(id).is_some()
    }

    /// Stage 1. Always present in a validated registry.
    pub fn introduction(&self) -> &StageDefinition {
        &self.stages[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &StageDefinition> {
        self.stages.iter()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

// ── Preferences ───────────────────────────────────────────────────────

/// One selectable option inside a preference category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceOption {
    pub label: String,
    pub description: String,
}

/// A configurable dimension of tutoring style.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceCategory {
    /// Stable identifier, e.g. `"learning_style"`.
    pub id: String,
    /// Heading shown in the preference panel, e.g. `"Learning Style"`.
    pub title: String,
    pub description: String,
    /// Index of the option selected for a fresh session.
    #[serde(default)]
    pub default_index: usize,
    pub options: Vec<PreferenceOption>,
}

impl PreferenceCategory {
    pub fn option(&self, label: &str) -> Option<&PreferenceOption> {
        self.options.iter().find(|o| o.label == label)
    }

    /// The default option, with `default_index` clamped to the option list.
    pub fn default_option(&self) -> &PreferenceOption {
        let idx = self.default_index.min(self.options.len().saturating_sub(1));
        &self.options[idx]
    }
}

/// Categories every tutor configuration must define. The behavioural rules
/// refer to all of them.
pub const REQUIRED_CATEGORIES: [&str; 6] = [
    "depth",
    "learning_style",
    "communication_style",
    "tone_style",
    "reasoning_framework",
    "feedback_type",
];

/// Ordered preference categories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreferenceRegistry {
    categories: Vec<PreferenceCategory>,
}

impl PreferenceRegistry {
    pub fn new(categories: Vec<PreferenceCategory>) -> Result<Self, ConfigError> {
        let registry = Self { categories };
        registry.validate()?;
        Ok(registry)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let mut ids = HashSet::new();
        for category in &self.categories {
            if !ids.insert(category.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate preference category '{}'",
                    category.id
                )));
            }
            if category.options.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "preference category '{}' has no options",
                    category.id
                )));
            }
            let mut labels = HashSet::new();
            if let Some(dup) = category
                .options
                .iter()
                .find(|o| !labels.insert(o.label.as_str()))
            {
                return Err(ConfigError::Invalid(format!(
                    "duplicate option '{}' in preference category '{}'",
                    dup.label, category.id
                )));
            }
        }
        if let Some(missing) = REQUIRED_CATEGORIES.iter().find(|id| !ids.contains(**id)) {
            return Err(ConfigError::Invalid(format!(
                "missing preference category '{missing}'"
            )));
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&PreferenceCategory> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PreferenceCategory> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
