//! Model traits

use super::types::{GenerateOptions, ModelError};
use crate::domain::{ChatMessage, LlmProvider};
use async_trait::async_trait;

/// A single language-model backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Which provider this client talks to
    fn provider(&self) -> LlmProvider;

    /// Whether a usable credential is configured
    fn is_available(&self) -> bool;

    /// Send the role-tagged messages and return the model's text
    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerateOptions,
    ) -> Result<String, ModelError>;
}
