//! The conversation controller.
//!
//! A [`ConversationController`] owns one session's [`ConversationState`]
//! and runs each tutor turn as two sequential LLM calls:
//!
//! 1. **Classify.** Ask the model which stage applies, using the stage
//!    prompt. Unrecognised answers fall back to stage 1. Skipped while the
//!    student has not said anything yet; stage 1 is selected directly.
//! 2. **Respond.** Ask for the tutor's reply with the chosen stage, the
//!    preference snapshot and the transcript window.
//!
//! Provider failures propagate unchanged and leave the state as it was
//! before the turn started. There is no retry loop here.

use std::sync::Arc;

use tracing::{debug, info};

use super::assembler::PromptAssembler;
use super::preferences::StudentPreferences;
use super::stage::resolve_stage;
use crate::api::LlmClient;
use crate::config::{StageDefinition, StageId, TutorConfig, TutorSettings};
use crate::context::budget::PromptBudget;
use crate::context::transcript::{ConversationTurn, END_OF_TURN, Speaker, Transcript};
use crate::error::{ProviderError, TutorError};

/// State of one tutoring session.
#[derive(Clone, Debug, PartialEq)]
pub struct ConversationState {
    pub stage: StageId,
    pub transcript: Transcript,
    /// Preferences used for the most recent tutor turn.
    pub preferences: StudentPreferences,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self {
            stage: StageId::INTRODUCTION,
            transcript: Transcript::new(),
            preferences: StudentPreferences::default(),
        }
    }
}

/// Drives the classify-then-respond loop for one session.
pub struct ConversationController {
    client: Arc<dyn LlmClient>,
    assembler: PromptAssembler,
    budget: PromptBudget,
    settings: TutorSettings,
    state: ConversationState,
}

impl ConversationController {
    pub fn new(
        client: Arc<dyn LlmClient>,
        config: Arc<TutorConfig>,
        settings: TutorSettings,
    ) -> Self {
        Self {
            client,
            assembler: PromptAssembler::new(config),
            budget: PromptBudget::new(settings.max_prompt_tokens),
            settings,
            state: ConversationState::default(),
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn transcript(&self) -> &Transcript {
        &self.state.transcript
    }

    pub fn config(&self) -> &TutorConfig {
        self.assembler.config()
    }

    /// The current stage definition.
    pub fn stage(&self) -> &StageDefinition {
        let stages = &self.config().stages;
        stages
            .get(self.state.stage)
            .unwrap_or_else(|| stages.introduction())
    }

    /// Reset to stage 1 with an empty transcript. Idempotent.
    pub fn seed(&mut self) {
        self.state.stage = StageId::INTRODUCTION;
        self.state.transcript.clear();
        self.state.preferences = StudentPreferences::default();
        debug!("Conversation seeded");
    }

    /// Record a student message. Does not generate a reply.
    pub fn submit_user_turn(&mut self, text: &str) -> Result<&ConversationTurn, TutorError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TutorError::EmptyInput);
        }
        Ok(self.state.transcript.push(Speaker::User, text))
    }

    /// Reseed and produce the tutor's opening message.
    ///
    /// If the greeting fails the previous conversation is restored.
    pub async fn greet(&mut self, preferences: &StudentPreferences) -> Result<String, TutorError> {
        let previous = self.state.clone();
        self.seed();
        match self.advance(preferences).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                debug!("Greeting failed; restoring previous conversation");
                self.state = previous;
                Err(e)
            }
        }
    }

    /// Run one tutor turn and return the reply text.
    pub async fn advance(
        &mut self,
        preferences: &StudentPreferences,
    ) -> Result<String, TutorError> {
        let stage_id = if self.state.transcript.has_user_turn() {
            self.classify().await?
        } else {
            debug!("No student input yet; selecting stage 1 without classification");
            StageId::INTRODUCTION
        };

        let config = self.assembler.config();
        let stage = config
            .stages
            .get(stage_id)
            .unwrap_or_else(|| config.stages.introduction());
        let agent = &config.agent;

        let turns = self.state.transcript.turns();
        let overhead = self
            .assembler
            .build_response_prompt(stage, preferences, &[], agent)
            .len();
        let window = self.budget.window(overhead, turns, &agent.name);
        let prompt = self
            .assembler
            .build_response_prompt(stage, preferences, window, agent);
        debug!(
            "Response {}",
            self.budget
                .estimate_usage(overhead, window, &agent.name)
                .to_log_string()
        );

        let raw = self
            .client
            .complete(&prompt, self.settings.response_temperature)
            .await?;
        let reply = clean_reply(&raw);

        if stage_id != self.state.stage {
            info!(
                "Conversation stage: {} -> {} ({})",
                self.state.stage, stage_id, stage.name
            );
        }
        self.state.stage = stage_id;
        self.state.preferences = preferences.clone();
        self.state.transcript.push(Speaker::Tutor, reply.clone());
        Ok(reply)
    }

    /// Ask the classifier for the next stage.
    async fn classify(&self) -> Result<StageId, ProviderError> {
        let config = self.assembler.config();
        let turns = self.state.transcript.turns();
        let overhead = self.assembler.build_stage_prompt(&[]).len();
        let window = self.budget.window(overhead, turns, &config.agent.name);
        let prompt = self.assembler.build_stage_prompt(window);

        let raw = self
            .client
            .complete(&prompt, self.settings.classify_temperature)
            .await?;
        debug!("Stage classifier answered {:?}", raw.trim());
        Ok(resolve_stage(&raw, &config.stages))
    }
}

/// Strip surrounding whitespace and a trailing end-of-turn marker.
fn clean_reply(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_suffix(END_OF_TURN)
        .unwrap_or(trimmed)
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::preferences::PreferencePanel;
    use crate::api::CompletionFuture;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Returns queued answers in order and records every call.
    #[derive(Default)]
    struct ScriptedClient {
        answers: Mutex<VecDeque<Result<String, ProviderError>>>,
        calls: Mutex<Vec<(String, f32)>>,
    }

    impl ScriptedClient {
        fn with(answers: Vec<Result<&str, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(
                    answers
                        .into_iter()
                        .map(|a| a.map(str::to_string))
                        .collect(),
                ),
                calls: Mutex::default(),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(p, _)| p.clone())
                .collect()
        }

        fn temperatures(&self) -> Vec<f32> {
            self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
        }
    }

    impl LlmClient for ScriptedClient {
        fn complete(&self, prompt: &str, temperature: f32) -> CompletionFuture<'_> {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), temperature));
            let answer = self
                .answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()));
            Box::pin(async move { answer })
        }
    }

    fn setup(
        answers: Vec<Result<&str, ProviderError>>,
    ) -> (Arc<ScriptedClient>, ConversationController, PreferencePanel) {
        setup_with(answers, TutorSettings::default())
    }

    fn setup_with(
        answers: Vec<Result<&str, ProviderError>>,
        settings: TutorSettings,
    ) -> (Arc<ScriptedClient>, ConversationController, PreferencePanel) {
        let config = Arc::new(TutorConfig::builtin().unwrap());
        let client = ScriptedClient::with(answers);
        let controller = ConversationController::new(client.clone(), config.clone(), settings);
        (client, controller, PreferencePanel::new(config))
    }

    #[tokio::test]
    async fn fresh_state_skips_classifier() {
        let (client, mut controller, panel) = setup(vec![Ok("Hello! I'm Larry. <END_OF_TURN>")]);

        let reply = controller.advance(&panel.snapshot()).await.unwrap();

        assert_eq!(reply, "Hello! I'm Larry.");
        assert_eq!(client.prompts().len(), 1, "only the response prompt is sent");
        assert_eq!(controller.state().stage, StageId::INTRODUCTION);
        assert_eq!(controller.transcript().len(), 1);
        assert_eq!(controller.transcript().turns()[0].speaker, Speaker::Tutor);
    }

    #[tokio::test]
    async fn classifier_answer_selects_stage() {
        let (client, mut controller, panel) =
            setup(vec![Ok("4"), Ok("Let's set up your preferences. <END_OF_TURN>")]);
        controller.submit_user_turn("I want to change my settings").unwrap();

        let reply = controller.advance(&panel.snapshot()).await.unwrap();

        assert_eq!(reply, "Let's set up your preferences.");
        assert_eq!(controller.state().stage, StageId::new(4));
        assert_eq!(controller.stage().name, "config");

        let prompts = client.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("User: I want to change my settings <END_OF_TURN>"));
        assert!(prompts[0].contains("one number only"));
        assert!(prompts[1].contains(&controller.stage().instruction));
        assert_eq!(client.temperatures(), vec![0.0, 0.9]);
    }

    #[tokio::test]
    async fn unrecognised_classifier_answers_fall_back_to_stage_one() {
        for answer in ["99", "abc", "", "  "] {
            let (_, mut controller, panel) =
                setup(vec![Ok("7"), Ok("Starting."), Ok(answer), Ok("ok")]);
            controller.submit_user_turn("start the lesson").unwrap();
            controller.advance(&panel.snapshot()).await.unwrap();
            assert_eq!(controller.state().stage, StageId::new(7));

            controller.submit_user_turn("hmm").unwrap();
            controller.advance(&panel.snapshot()).await.unwrap();
            assert_eq!(
                controller.state().stage,
                StageId::INTRODUCTION,
                "answer {answer:?} should fall back"
            );
        }
    }

    #[tokio::test]
    async fn seed_is_idempotent() {
        let (_, mut controller, panel) = setup(vec![Ok("Hi"), Ok("3"), Ok("Quiz time")]);
        controller.advance(&panel.snapshot()).await.unwrap();
        controller.submit_user_turn("test me").unwrap();
        controller.advance(&panel.snapshot()).await.unwrap();
        assert_eq!(controller.state().stage, StageId::new(3));

        controller.seed();
        let first = controller.state().clone();
        controller.seed();

        assert_eq!(&first, controller.state());
        assert_eq!(first.stage, StageId::INTRODUCTION);
        assert!(first.transcript.is_empty());
    }

    #[tokio::test]
    async fn turn_pairs_read_back_in_order() {
        let n = 5;
        let mut answers = Vec::new();
        let replies: Vec<String> = (0..n).map(|i| format!("reply {i}")).collect();
        for reply in &replies {
            answers.push(Ok("2"));
            answers.push(Ok(reply.as_str()));
        }
        let (_, mut controller, panel) = setup(answers);

        for i in 0..n {
            controller.submit_user_turn(&format!("message {i}")).unwrap();
            controller.advance(&panel.snapshot()).await.unwrap();
        }

        let turns = controller.transcript().turns();
        assert_eq!(turns.len(), 2 * n);
        for i in 0..n {
            let user = &turns[2 * i];
            let tutor = &turns[2 * i + 1];
            assert_eq!(user.speaker, Speaker::User);
            assert_eq!(user.text, format!("message {i}"));
            assert_eq!(tutor.speaker, Speaker::Tutor);
            assert_eq!(tutor.text, replies[i]);
            assert_eq!(user.position, 2 * i);
            assert_eq!(tutor.position, 2 * i + 1);
        }
    }

    #[tokio::test]
    async fn entropy_scenario_prompt_reflects_preferences() {
        let (client, mut controller, mut panel) = setup(vec![Ok("1"), Ok("Entropy is...")]);
        panel.select("depth", "Surface level").unwrap();
        panel.select("learning_style", "Visual").unwrap();

        controller.submit_user_turn("Teach me about entropy").unwrap();
        controller.advance(&panel.snapshot()).await.unwrap();

        let prompts = client.prompts();
        let response_prompt = &prompts[1];
        let stage_one = &controller.config().stages.introduction().instruction;
        assert!(response_prompt.contains("Surface level"));
        assert!(response_prompt.contains("Visual"));
        assert!(response_prompt.contains(stage_one.as_str()));
        assert!(response_prompt.contains("Teach me about entropy"));
        assert_eq!(controller.state().preferences, panel.snapshot());
    }

    #[tokio::test]
    async fn classifier_failure_leaves_state_unchanged() {
        let (_, mut controller, panel) = setup(vec![Err(ProviderError::Http {
            status: 429,
            body: "rate limited".into(),
        })]);
        controller.submit_user_turn("hello").unwrap();
        let before = controller.state().clone();

        let err = controller.advance(&panel.snapshot()).await.unwrap_err();

        assert!(matches!(err, TutorError::Provider(ref e) if e.is_rate_limited()));
        assert_eq!(&before, controller.state());
    }

    #[tokio::test]
    async fn response_failure_leaves_state_unchanged() {
        let (_, mut controller, panel) = setup(vec![
            Ok("5"),
            Err(ProviderError::Transport("connection reset".into())),
        ]);
        controller.submit_user_turn("plan please").unwrap();
        let before = controller.state().clone();

        let err = controller.advance(&panel.snapshot()).await.unwrap_err();

        assert!(matches!(err, TutorError::Provider(ProviderError::Transport(_))));
        assert_eq!(&before, controller.state());
    }

    #[tokio::test]
    async fn greet_reseeds_before_introduction() {
        let (client, mut controller, panel) =
            setup(vec![Ok("Hi"), Ok("8"), Ok("Stopped"), Ok("Hi again")]);
        controller.greet(&panel.snapshot()).await.unwrap();
        controller.submit_user_turn("stop").unwrap();
        controller.advance(&panel.snapshot()).await.unwrap();

        let reply = controller.greet(&panel.snapshot()).await.unwrap();

        assert_eq!(reply, "Hi again");
        assert_eq!(controller.transcript().len(), 1);
        assert_eq!(controller.state().stage, StageId::INTRODUCTION);
        assert_eq!(client.prompts().len(), 4);
    }

    #[tokio::test]
    async fn failed_greet_restores_previous_conversation() {
        let (_, mut controller, panel) = setup(vec![
            Ok("Hi"),
            Ok("3"),
            Ok("Quiz time"),
            Err(ProviderError::Transport("connection reset".into())),
        ]);
        controller.greet(&panel.snapshot()).await.unwrap();
        controller.submit_user_turn("test me").unwrap();
        controller.advance(&panel.snapshot()).await.unwrap();
        let before = controller.state().clone();

        let err = controller.greet(&panel.snapshot()).await.unwrap_err();

        assert!(matches!(err, TutorError::Provider(ProviderError::Transport(_))));
        assert_eq!(&before, controller.state());
        assert_eq!(controller.transcript().len(), 3);
        assert_eq!(controller.state().stage, StageId::new(3));
    }

    #[test]
    fn empty_input_rejected() {
        let (_, mut controller, _) = setup(vec![]);
        assert!(matches!(
            controller.submit_user_turn("   \n"),
            Err(TutorError::EmptyInput)
        ));
        assert!(controller.transcript().is_empty());
    }

    #[tokio::test]
    async fn prompt_window_trims_oldest_turns_only() {
        let settings = TutorSettings {
            max_prompt_tokens: 2_000,
            ..Default::default()
        };
        let mut answers = Vec::new();
        for _ in 0..30 {
            answers.push(Ok("2"));
            answers.push(Ok("noted"));
        }
        let (client, mut controller, panel) = setup_with(answers, settings);

        for i in 0..30 {
            let filler = "lorem ipsum ".repeat(40);
            controller
                .submit_user_turn(&format!("marker-{i:02} {filler}"))
                .unwrap();
            controller.advance(&panel.snapshot()).await.unwrap();
        }

        assert_eq!(controller.transcript().len(), 60);
        let last_prompt = client.prompts().pop().unwrap();
        assert!(last_prompt.contains("marker-29"));
        assert!(!last_prompt.contains("marker-00"));
    }

    #[test]
    fn clean_reply_strips_marker() {
        assert_eq!(clean_reply("  Hello there <END_OF_TURN>\n"), "Hello there");
        assert_eq!(clean_reply("No marker"), "No marker");
    }
}
