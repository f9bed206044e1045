//! Generation provider trait

use async_trait::async_trait;

use crate::error::Result;

/// Trait for prompt completion
///
/// One synchronous response per call; the agent never streams. The same
/// call is used for answering, classification, self-critique, and question
/// reformulation. The prompt decides which.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a prompt
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String>;

    /// Check if the provider is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// The model being used
    fn model(&self) -> &str;
}
