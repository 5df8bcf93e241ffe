use anyhow::Result;
use async_trait::async_trait;

use cwn_api::CowinApi;
use cwn_core::types::Credential;

/// Human in the loop. Prompts block the single logical activity, the same
/// way a network call does; implementations decide how the question reaches
/// a terminal.
#[async_trait]
pub trait Operator: Send + Sync {
    /// Free-form question, returns the operator's line.
    async fn prompt(&self, question: &str) -> Result<String>;

    /// Yes/no question. Implementations keep asking until they get a valid
    /// answer.
    async fn confirm(&self, question: &str) -> Result<bool>;
}

/// Produces a human-transcribed captcha for a booking attempt.
///
/// The booking stage consumes this twice: once before its first pass, and
/// again whenever the supervisor re-authenticates (a new token invalidates
/// the previous transcription).
#[async_trait]
pub trait CaptchaSource: Send + Sync {
    async fn transcribe(&self, api: &dyn CowinApi, credential: &Credential) -> Result<String>;
}
