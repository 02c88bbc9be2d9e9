//! Student preferences and the panel that edits them.
//!
//! [`PreferencePanel`] is the only writer of [`StudentPreferences`]. Every
//! category starts at its configured default option; a selection takes
//! effect immediately and is validated against the registry. The controller
//! reads a [`snapshot`](PreferencePanel::snapshot) before each turn.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::config::{PreferenceOption, TutorConfig};
use crate::error::TutorError;

/// One selected option label per preference category.
///
/// Only a [`PreferencePanel`] can fill one in, so every label is known to
/// the registry. There is no way to deserialize selections around it:
///
/// ```compile_fail
/// let prefs: tutor_rs::agent::StudentPreferences =
///     serde_json::from_str(r#"{"depth":"Bottomless"}"#).unwrap();
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StudentPreferences {
    selections: BTreeMap<String, String>,
}

impl StudentPreferences {
    /// Selected label for `category`.
    pub fn get(&self, category: &str) -> Option<&str> {
        self.selections.get(category).map(String::as_str)
    }

    /// `(category, label)` pairs in category-id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.selections
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }
}

/// A category rendered as a single-choice selector.
#[derive(Clone, Debug, Serialize)]
pub struct PreferenceWidget {
    pub category: String,
    pub title: String,
    pub description: String,
    pub options: Vec<String>,
    pub selected: String,
    /// Description of the selected option, shown under the selector.
    pub selected_description: String,
}

/// Single-choice selectors over the preference registry.
#[derive(Clone, Debug)]
pub struct PreferencePanel {
    config: Arc<TutorConfig>,
    preferences: StudentPreferences,
}

impl PreferencePanel {
    /// A panel with every category at its default option.
    pub fn new(config: Arc<TutorConfig>) -> Self {
        let preferences = defaults(&config);
        Self {
            config,
            preferences,
        }
    }

    /// Select `option` for `category`.
    ///
    /// Rejects unknown categories and labels; the previous selection is kept
    /// in that case.
    pub fn select(&mut self, category: &str, option: &str) -> Result<(), TutorError> {
        let cat = self
            .config
            .personalization
            .get(category)
            .ok_or_else(|| TutorError::UnknownPreferenceCategory(category.to_string()))?;
        if cat.option(option).is_none() {
            return Err(TutorError::UnknownPreferenceOption {
                category: category.to_string(),
                option: option.to_string(),
            });
        }
        info!("Preference {category} set to {option:?}");
        self.preferences
            .selections
            .insert(category.to_string(), option.to_string());
        Ok(())
    }

    /// Restore every category to its default.
    pub fn reset(&mut self) {
        self.preferences = defaults(&self.config);
    }

    /// Read-only copy of the current selections.
    pub fn snapshot(&self) -> StudentPreferences {
        self.preferences.clone()
    }

    /// The selected option of `category`.
    pub fn selected(&self, category: &str) -> Option<&PreferenceOption> {
        let cat = self.config.personalization.get(category)?;
        self.preferences
            .get(category)
            .and_then(|label| cat.option(label))
    }

    /// All categories as selectors, in registry order.
    pub fn widgets(&self) -> Vec<PreferenceWidget> {
        self.config
            .personalization
            .iter()
            .map(|cat| {
                let selected = self
                    .preferences
                    .get(&cat.id)
                    .and_then(|label| cat.option(label))
                    .unwrap_or_else(|| cat.default_option());
                PreferenceWidget {
                    category: cat.id.clone(),
                    title: cat.title.clone(),
                    description: cat.description.clone(),
                    options: cat.options.iter().map(|o| o.label.clone()).collect(),
                    selected: selected.label.clone(),
                    selected_description: selected.description.clone(),
                }
            })
            .collect()
    }
}

fn defaults(config: &TutorConfig) -> StudentPreferences {
    let selections = config
        .personalization
        .iter()
        .map(|cat| (cat.id.clone(), cat.default_option().label.clone()))
        .collect();
    StudentPreferences { selections }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel() -> PreferencePanel {
        PreferencePanel::new(Arc::new(TutorConfig::builtin().unwrap()))
    }

    #[test]
    fn defaults_to_first_option() {
        let panel = panel();
        let prefs = panel.snapshot();
        assert_eq!(prefs.len(), 6);
        assert_eq!(prefs.get("depth"), Some("Surface level"));
        assert_eq!(prefs.get("learning_style"), Some("Sensing"));
        assert_eq!(prefs.get("feedback_type"), Some("Immediate"));
    }

    #[test]
    fn select_takes_effect_immediately() {
        let mut panel = panel();
        panel.select("learning_style", "Visual").unwrap();
        assert_eq!(panel.snapshot().get("learning_style"), Some("Visual"));
        assert_eq!(
            panel.selected("learning_style").unwrap().description,
            "Prefer visual representations of presented material - pictures, diagrams, flow charts"
        );
    }

    #[test]
    fn unknown_option_rejected_and_selection_kept() {
        let mut panel = panel();
        panel.select("tone_style", "Friendly").unwrap();
        let err = panel.select("tone_style", "Sarcastic").unwrap_err();
        assert!(matches!(
            err,
            TutorError::UnknownPreferenceOption { ref category, ref option }
                if category == "tone_style" && option == "Sarcastic"
        ));
        assert_eq!(panel.snapshot().get("tone_style"), Some("Friendly"));
    }

    #[test]
    fn label_from_another_category_rejected() {
        let mut panel = panel();
        // "Visual" is a learning style, not a depth.
        assert!(panel.select("depth", "Visual").is_err());
    }

    #[test]
    fn unknown_category_rejected() {
        let mut panel = panel();
        let err = panel.select("humour", "Dry").unwrap_err();
        assert!(matches!(err, TutorError::UnknownPreferenceCategory(ref c) if c == "humour"));
    }

    #[test]
    fn reset_restores_defaults() {
        let mut panel = panel();
        panel.select("depth", "Expert insight").unwrap();
        panel.reset();
        assert_eq!(panel.snapshot().get("depth"), Some("Surface level"));
    }

    #[test]
    fn widgets_follow_registry_order() {
        let mut panel = panel();
        panel.select("communication_style", "Socratic").unwrap();
        let widgets = panel.widgets();
        let ids: Vec<&str> = widgets.iter().map(|w| w.category.as_str()).collect();
        assert_eq!(
            ids,
            [
                "depth",
                "learning_style",
                "communication_style",
                "tone_style",
                "reasoning_framework",
                "feedback_type"
            ]
        );
        let comm = &widgets[2];
        assert_eq!(comm.title, "Communication Style");
        assert_eq!(comm.selected, "Socratic");
        assert_eq!(comm.options.len(), 7);
        assert!(comm.selected_description.starts_with("Asks thought-provoking"));
    }
}
