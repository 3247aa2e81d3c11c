//! OpenRouter chat completions client

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::provider::{CompletionOptions, LlmProvider};
use super::retry::KeyRing;
use crate::error::AgentError;

const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// HTTP provider with built-in credential rotation: 401, 403, and 429
/// responses advance the key ring and retry until every key has been
/// tried once.
pub struct OpenRouterProvider {
    client: reqwest::Client,
    keys: KeyRing,
    endpoint: String,
}

impl OpenRouterProvider {
    pub fn new(api_keys: Vec<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            keys: KeyRing::new(api_keys),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Point at a different chat-completions endpoint. Used for
    /// OpenRouter-compatible servers and in tests.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn request_once(
        &self,
        key: &str,
        system_prompt: &str,
        user_message: &str,
        options: &CompletionOptions,
    ) -> Result<String, AgentError> {
        let body = ChatRequest {
            model: &options.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_message,
                },
            ],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|err| AgentError::Provider(format!("request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AgentError::Provider(format!(
                "status {}: {}",
                status.as_u16(),
                truncate(&detail, 200)
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|err| AgentError::Provider(format!("malformed response body: {err}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AgentError::Provider("response contained no choices".to_string()))?;

        debug!("model returned {} chars", content.len());
        Ok(content)
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenRouterProvider {
    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
        options: &CompletionOptions,
    ) -> Result<String, AgentError> {
        self.keys
            .with_rotation(|key| async move {
                self.request_once(&key, system_prompt, user_message, options)
                    .await
            })
            .await
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_status_errors_classify_for_rotation() {
        let rotating = [
            StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN,
            StatusCode::TOO_MANY_REQUESTS,
        ];
        for status in rotating {
            let err = AgentError::Provider(format!("status {}: denied", status.as_u16()));
            assert!(err.is_credential_failure());
        }
        let err = AgentError::Provider("status 500: oops".to_string());
        assert!(!err.is_credential_failure());
    }

    #[test]
    fn test_request_body_shape() {
        let body = ChatRequest {
            model: "deepseek/deepseek-chat",
            messages: vec![ChatMessage {
                role: "system",
                content: "be brief",
            }],
            max_tokens: 100,
            temperature: 0.7,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "deepseek/deepseek-chat");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["max_tokens"], 100);
    }
}
