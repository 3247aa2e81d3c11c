//! Provider abstraction

use async_trait::async_trait;

use crate::error::AgentError;

/// Per-call tuning passed through to the provider.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
}

/// One chat turn in, raw text out. Implementations own credentials,
/// transport, and retries; callers own timeouts.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
        options: &CompletionOptions,
    ) -> Result<String, AgentError>;
}
