//! The LLM boundary.
//!
//! Everything the conversation controller needs from a hosted model goes
//! through [`LlmClient::complete`]: one prompt in, one text out, or a
//! [`ProviderError`]. [`OpenRouterClient`](crate::OpenRouterClient) is the
//! production implementation; tests plug in scripted fakes.

use std::future::Future;
use std::pin::Pin;

use crate::error::ProviderError;

/// Boxed future returned by [`LlmClient::complete`].
pub type CompletionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, ProviderError>> + Send + 'a>>;

/// A text-completion backend.
///
/// Uses a boxed future so that the trait is dyn-compatible and the
/// controller can hold an `Arc<dyn LlmClient>`.
///
/// # Example
///
/// ```
/// use tutor_rs::api::{CompletionFuture, LlmClient};
///
/// struct Echo;
///
/// impl LlmClient for Echo {
///     fn complete(&self, prompt: &str, _temperature: f32) -> CompletionFuture<'_> {
///         let prompt = prompt.to_string();
///         Box::pin(async move { Ok(prompt) })
///     }
/// }
/// ```
pub trait LlmClient: Send + Sync {
    /// Complete `prompt` at the given sampling temperature.
    fn complete(&self, prompt: &str, temperature: f32) -> CompletionFuture<'_>;
}
