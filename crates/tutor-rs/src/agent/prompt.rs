//! Structured prompt builder.
//!
//! [`SystemPromptBuilder`] assembles multi-section prompts: a preamble,
//! headed sections, and raw blocks, joined with blank lines. Empty sections
//! are skipped so optional content never leaves a dangling heading.

/// Builder for multi-section prompts.
///
/// # Example
///
/// ```
/// use tutor_rs::agent::prompt::SystemPromptBuilder;
///
/// let prompt = SystemPromptBuilder::new("You are a tutor.")
///     .section("Current Conversation Stage", "Introduction: greet the student.")
///     .section("Empty", "")
///     .raw("Larry: ")
///     .build();
///
/// assert!(prompt.contains("## Current Conversation Stage"));
/// assert!(!prompt.contains("## Empty"));
/// assert!(prompt.ends_with("Larry: "));
/// ```
pub struct SystemPromptBuilder {
    sections: Vec<String>,
}

impl SystemPromptBuilder {
    /// Create a new builder with an initial preamble section.
    ///
    /// The preamble is included as-is (no heading prefix). Sections added
    /// via `section()` get `## ` headings.
    pub fn new(preamble: impl Into<String>) -> Self {
        Self {
            sections: vec![preamble.into()],
        }
    }

    /// Append a named section with a markdown heading.
    ///
    /// Skipped if `content` is empty.
    pub fn section(mut self, heading: &str, content: impl Into<String>) -> Self {
        let content = content.into();
        if !content.is_empty() {
            self.sections.push(format!("## {heading}\n\n{content}"));
        }
        self
    }

    /// Append raw text without a heading.
    ///
    /// Skipped if `content` is empty.
    pub fn raw(mut self, content: impl Into<String>) -> Self {
        let content = content.into();
        if !content.is_empty() {
            self.sections.push(content);
        }
        self
    }

    /// Build the final prompt by joining all sections with double newlines.
    pub fn build(self) -> String {
        self.sections.join("\n\n")
    }
}
