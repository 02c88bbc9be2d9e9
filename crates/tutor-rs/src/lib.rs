//! Preference-driven conversational tutor on top of hosted LLM completions.
//!
//! `tutor-rs` implements "Larry", a tutoring assistant that collects a
//! student's preferences (depth, learning style, communication style, tone,
//! reasoning framework, feedback type), injects them into prompt templates,
//! and forwards the composed prompt to the
//! [OpenRouter](https://openrouter.ai/) chat completions API.
//!
//! Each turn is two sequential calls: the model is first asked which
//! conversation stage applies, then asked for the tutor's reply given that
//! stage and the current preferences.
//!
//! # Getting started
//!
//! ```ignore
//! use std::sync::Arc;
//! use tutor_rs::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(TutorConfig::builtin()?);
//!     let client = OpenRouterClient::from_env()?.with_model("anthropic/claude-sonnet-4");
//!
//!     let mut panel = PreferencePanel::new(config.clone());
//!     panel.select("depth", "Surface level")?;
//!
//!     let mut controller =
//!         ConversationController::new(Arc::new(client), config, TutorSettings::default());
//!     println!("{}", controller.greet(&panel.snapshot()).await?);
//!
//!     controller.submit_user_turn("Teach me about entropy")?;
//!     println!("{}", controller.advance(&panel.snapshot()).await?);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`agent`] | [`ConversationController`](agent::ConversationController), prompt assembly, stage parsing, preference panel |
//! | [`config`] | Preference and stage registries, agent identity, runtime settings |
//! | [`context`] | Transcript and prompt-size budget |
//! | [`api`] | The [`LlmClient`](api::LlmClient) boundary |
//! | [`error`] | Typed errors |

pub mod agent;
pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod prelude;

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::api::{CompletionFuture, LlmClient};
use crate::error::ProviderError;

// ── Constants ──────────────────────────────────────────────────────

pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model for all LLM calls.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Default per-response token limit.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

// ── Request types ──────────────────────────────────────────────────

/// Chat completion request body. Only the fields the tutor uses.
#[derive(Serialize, Debug, Default)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "is_zero_u32")]
    pub max_tokens: u32,
    /// Always sent: a temperature of 0.0 is meaningful for classification.
    pub temperature: f32,
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message sent to the chat completions endpoint.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

// ── Response types ─────────────────────────────────────────────────

/// Raw API response (internal deserialization target).
#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Clean return type from [`OpenRouterClient::chat()`].
#[derive(Debug)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub usage: Option<UsageInfo>,
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Deserialize, Debug, Clone)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for the OpenRouter chat completions API.
pub struct OpenRouterClient {
    client: reqwest::Client,
    api_key: String,
    referer: String,
    title: String,
    model: String,
    max_tokens: u32,
}

impl OpenRouterClient {
    /// Create a new client with the given API key and default headers.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_headers(api_key, "https://github.com/tutor-rs", "tutor-rs")
    }

    /// Create a client from the `OPENROUTER_KEY` environment variable.
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = std::env::var("OPENROUTER_KEY").map_err(|_| ProviderError::MissingApiKey)?;
        Self::new(api_key)
    }

    /// Create a new client with custom Referer and X-Title headers.
    pub fn with_headers(
        api_key: impl Into<String>,
        referer: impl Into<String>,
        title: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .user_agent("tutor-rs/0.1")
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            referer: referer.into(),
            title: title.into(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }

    /// Model used by [`LlmClient::complete`].
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Per-response token limit used by [`LlmClient::complete`].
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a chat completion request.
    pub async fn chat(&self, body: &ChatRequest) -> Result<ChatCompletion, ProviderError> {
        debug!(
            "LLM request: model={}, messages={}, max_tokens={}, temp={}",
            body.model,
            body.messages.len(),
            body.max_tokens,
            body.temperature,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let resp = self
            .client
            .post(OPENROUTER_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ProviderError::Transport(format!("failed to read response: {e}")))?;

        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        decode_response(status.as_u16(), &text)
    }
}

/// Turn an HTTP status and body into a [`ChatCompletion`].
fn decode_response(status: u16, text: &str) -> Result<ChatCompletion, ProviderError> {
    if !(200..300).contains(&status) {
        return Err(ProviderError::Http {
            status,
            body: text.to_string(),
        });
    }

    let parsed: RawChatResponse =
        serde_json::from_str(text).map_err(|e| ProviderError::Decode(e.to_string()))?;

    if let Some(err) = parsed.error {
        return Err(ProviderError::Api(err.message));
    }

    if let Some(ref usage) = parsed.usage {
        debug!(
            "Token usage: prompt={}, completion={}, total={}",
            usage.prompt_tokens.unwrap_or(0),
            usage.completion_tokens.unwrap_or(0),
            usage.total_tokens.unwrap_or(0),
        );
    }

    match parsed.choices.and_then(|c| c.into_iter().next()) {
        Some(c) => Ok(ChatCompletion {
            content: c.message.content,
            usage: parsed.usage,
            finish_reason: c.finish_reason,
        }),
        None => Err(ProviderError::EmptyResponse),
    }
}

impl LlmClient for OpenRouterClient {
    fn complete(&self, prompt: &str, temperature: f32) -> CompletionFuture<'_> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message::user(prompt)],
            max_tokens: self.max_tokens,
            temperature,
        };
        Box::pin(async move {
            let completion = self.chat(&body).await?;
            if completion.finish_reason.as_deref() == Some("length") {
                debug!("LLM output cut at max_tokens={}", body.max_tokens);
            }
            Ok(completion.content.unwrap_or_default())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_constructor() {
        let user = Message::user("world");
        assert_eq!(user.role, MessageRole::User);
        assert_eq!(user.content, "world");
    }

    #[test]
    fn chat_request_keeps_zero_temperature() {
        let req = ChatRequest {
            model: "test-model".into(),
            messages: vec![Message::user("hi")],
            max_tokens: 100,
            temperature: 0.0,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["temperature"], 0.0);
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn decode_success_returns_first_choice() {
        let body = r#"{
            "choices": [{"message": {"content": "4"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 1, "total_tokens": 11}
        }"#;
        let completion = decode_response(200, body).unwrap();
        assert_eq!(completion.content.as_deref(), Some("4"));
        assert_eq!(completion.finish_reason.as_deref(), Some("stop"));
        assert_eq!(completion.usage.unwrap().total_tokens, Some(11));
    }

    #[test]
    fn decode_non_success_is_http_error() {
        let err = decode_response(429, "rate limited").unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[test]
    fn decode_error_body_is_api_error() {
        let err = decode_response(200, r#"{"error": {"message": "no credits"}}"#).unwrap_err();
        assert!(matches!(err, ProviderError::Api(ref m) if m == "no credits"));
    }

    #[test]
    fn decode_garbage_is_decode_error() {
        let err = decode_response(200, "<html>").unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)));
    }

    #[test]
    fn decode_no_choices_is_empty_response() {
        let err = decode_response(200, r#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse));
    }

    #[test]
    fn client_builder_sets_model() {
        let client = OpenRouterClient::new("sk-test")
            .unwrap()
            .with_model("google/gemini-2.5-flash")
            .with_max_tokens(256);
        assert_eq!(client.model(), "google/gemini-2.5-flash");
        assert_eq!(client.max_tokens, 256);
    }
}
