//! Answer generator capability

use async_trait::async_trait;
use crate::error::Result;
use crate::generation::Prompt;

/// Trait for answer generation from a grounded prompt
///
/// Failures (rate limits, timeouts, malformed output) are handled by the
/// caller's extractive fallback.
///
/// Implementations:
/// - `ExtractiveGenerator`: picks answer sentences from the passages
/// - `OllamaLlm`: Local Ollama server (phi3, llama3, etc.)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate answer text for a prompt
    async fn generate(&self, prompt: &Prompt) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
