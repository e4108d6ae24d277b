//! LLM provider trait for text generation

use async_trait::async_trait;

use crate::error::Result;

/// Trait for generating text from a prompt
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for a fully-built prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model identifier for logging
    fn model(&self) -> &str;
}
