//! Answer generator trait for producing text from an assembled prompt.

use async_trait::async_trait;

use crate::error::Result;

/// A language model that turns a prompt into generated text.
///
/// The pipeline returns the generated text unmodified and makes a single
/// attempt per call; retry and timeout policies belong to the caller.
/// Failures are reported as [`RagError::ExternalService`](crate::RagError::ExternalService)
/// with kind `ModelUnavailable` or `ContextTooLong`.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
