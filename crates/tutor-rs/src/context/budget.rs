//! Prompt size budget.
//!
//! Every turn re-sends the conversation history, so prompts grow without
//! bound. [`PromptBudget`] estimates prompt size from character counts and
//! picks the newest suffix of the transcript that still fits. The stored
//! transcript is never touched; only the prompt window shrinks.

use tracing::debug;

use super::transcript::ConversationTurn;

/// Characters per token (conservative estimate for English text).
/// Most tokenizers average 3-4 chars per token; we use 3.5 as a middle ground.
pub const CHARS_PER_TOKEN: f64 = 3.5;

/// Estimates prompt size and windows the transcript to a token budget.
///
/// # Example
///
/// ```ignore
/// let budget = PromptBudget::new(8_000);
/// let window = budget.window(fixed_prompt.len(), transcript.turns(), "Larry");
/// let history = render_history(window, "Larry");
/// ```
#[derive(Debug, Clone)]
pub struct PromptBudget {
    /// Maximum prompt size in estimated tokens.
    max_tokens: usize,
}

impl PromptBudget {
    pub fn new(max_tokens: usize) -> Self {
        Self { max_tokens }
    }

    fn tokens_for(&self, chars: usize) -> usize {
        (chars as f64 / CHARS_PER_TOKEN) as usize
    }

    /// Estimate the usage of a prompt made of `fixed_chars` of template text
    /// plus the rendered `turns`.
    pub fn estimate_usage(
        &self,
        fixed_chars: usize,
        turns: &[ConversationTurn],
        agent_name: &str,
    ) -> PromptUsage {
        let history_chars: usize = turns.iter().map(|t| line_len(t, agent_name)).sum();
        let estimated_tokens = self.tokens_for(fixed_chars + history_chars);
        let usage_pct = if self.max_tokens > 0 {
            estimated_tokens as f64 / self.max_tokens as f64
        } else {
            1.0
        };
        PromptUsage {
            estimated_tokens,
            max_tokens: self.max_tokens,
            usage_pct,
        }
    }

    /// The newest suffix of `turns` that fits in the budget next to
    /// `fixed_chars` of template text.
    ///
    /// The newest turn is always included even when it alone exceeds the
    /// budget: a prompt without the student's last message is useless.
    pub fn window<'a>(
        &self,
        fixed_chars: usize,
        turns: &'a [ConversationTurn],
        agent_name: &str,
    ) -> &'a [ConversationTurn] {
        let mut used = fixed_chars;
        let mut start = turns.len();
        for (idx, turn) in turns.iter().enumerate().rev() {
            used += line_len(turn, agent_name);
            if start < turns.len() && self.tokens_for(used) > self.max_tokens {
                break;
            }
            start = idx;
        }

        if start > 0 {
            debug!(
                "Prompt budget: omitting {} oldest turn(s), keeping {} ({} max tokens)",
                start,
                turns.len() - start,
                self.max_tokens
            );
        }
        &turns[start..]
    }
}

/// Rendered length of one history line, including the joining newline.
fn line_len(turn: &ConversationTurn, agent_name: &str) -> usize {
    turn.render(agent_name).len() + 1
}

/// Snapshot of prompt usage.
#[derive(Debug)]
pub struct PromptUsage {
    /// Estimated tokens consumed.
    pub estimated_tokens: usize,
    /// Budget.
    pub max_tokens: usize,
    /// Usage as a fraction (0.0 to 1.0+).
    pub usage_pct: f64,
}

impl PromptUsage {
    /// Format as a short log-friendly string.
    pub fn to_log_string(&self) -> String {
        format!(
            "prompt: ~{} tokens ({:.0}% of {})",
            self.estimated_tokens,
            self.usage_pct * 100.0,
            self.max_tokens,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::transcript::{Speaker, Transcript};

    fn transcript_of(n: usize, text_len: usize) -> Transcript {
        let mut t = Transcript::new();
        for i in 0..n {
            let speaker = if i % 2 == 0 { Speaker::User } else { Speaker::Tutor };
            t.push(speaker, "x".repeat(text_len));
        }
        t
    }

    #[test]
    fn small_history_kept_whole() {
        let budget = PromptBudget::new(10_000);
        let t = transcript_of(4, 20);
        assert_eq!(budget.window(500, t.turns(), "Larry").len(), 4);
    }

    #[test]
    fn long_history_keeps_newest_turns() {
        // Each line is roughly 100 chars ≈ 28 tokens; a 100-token budget
        // leaves room for three lines.
        let budget = PromptBudget::new(100);
        let t = transcript_of(10, 80);
        let window = budget.window(0, t.turns(), "Larry");
        assert!(window.len() < 10);
        assert!(!window.is_empty());
        assert_eq!(window.last().unwrap().position, 9);
        assert_eq!(window[0].position, 10 - window.len());
    }

    #[test]
    fn newest_turn_kept_even_when_over_budget() {
        let budget = PromptBudget::new(10);
        let t = transcript_of(3, 1_000);
        let window = budget.window(5_000, t.turns(), "Larry");
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].position, 2);
    }

    #[test]
    fn empty_history_is_empty_window() {
        let budget = PromptBudget::new(10);
        assert!(budget.window(100, &[], "Larry").is_empty());
    }

    #[test]
    fn usage_accounts_for_fixed_text() {
        let budget = PromptBudget::new(1_000);
        let t = transcript_of(2, 10);
        let bare = budget.estimate_usage(0, t.turns(), "Larry");
        let with_fixed = budget.estimate_usage(3_500, t.turns(), "Larry");
        assert_eq!(with_fixed.estimated_tokens - bare.estimated_tokens, 1_000);
        assert!(with_fixed.usage_pct > 1.0);
        assert!(with_fixed.to_log_string().contains("prompt:"));
    }
}
