//! LLM client abstraction and request/response types.

use docroute_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Deadline used when a request carries none.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// LLM completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// The prompt text to send to the LLM
    pub prompt: String,

    /// Model identifier (e.g., "llama3.2", "openai/gpt-oss-20b:free")
    pub model: String,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Temperature for sampling (0.0 - 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// System prompt (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Deadline for the whole call
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl LlmRequest {
    /// Create a new LLM request with required fields.
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            max_tokens: None,
            temperature: None,
            system: None,
            timeout: None,
        }
    }

    /// Set the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the temperature for sampling.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the system prompt.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the call deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The deadline providers should apply to their HTTP call.
    pub fn effective_timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT)
    }
}

/// LLM completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// The generated text
    pub content: String,

    /// Model that generated the response
    pub model: String,

    /// Usage statistics
    pub usage: LlmUsage,
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmUsage {
    /// Tokens in the prompt
    #[serde(default)]
    pub prompt_tokens: u32,

    /// Tokens in the completion
    #[serde(default)]
    pub completion_tokens: u32,

    /// Total tokens used
    #[serde(default)]
    pub total_tokens: u32,
}

impl LlmUsage {
    /// Create usage stats from prompt and completion token counts.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Trait for completion providers.
///
/// Implementations report an expired deadline as [`AppError::Timeout`] and
/// every other failure as [`AppError::Llm`].
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Get the provider name (e.g., "ollama", "openai").
    fn provider_name(&self) -> &str;

    /// Perform a non-streaming completion.
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse>;
}

/// Run a completion under a hard deadline.
///
/// The deadline is also attached to the request so HTTP providers can
/// abort the underlying connection. Whichever fires first wins; both
/// surface as [`AppError::Timeout`].
pub async fn complete_with_timeout(
    client: &dyn LlmClient,
    request: LlmRequest,
    timeout: Duration,
) -> AppResult<LlmResponse> {
    let request = request.with_timeout(timeout);

    match tokio::time::timeout(timeout, client.complete(&request)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                "Completion via '{}' exceeded {:?}",
                client.provider_name(),
                timeout
            );
            Err(AppError::Timeout(timeout))
        }
    }
}

/// Map a transport error, keeping deadline expiry distinguishable.
pub(crate) fn map_transport_error(
    err: reqwest::Error,
    timeout: Duration,
    provider: &str,
) -> AppError {
    if err.is_timeout() {
        AppError::Timeout(timeout)
    } else {
        AppError::Llm(format!("Failed to send request to {}: {}", provider, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockLlmClient;

    #[test]
    fn test_request_builder() {
        let request = LlmRequest::new("Hi", "llama3.2")
            .with_system("Be brief")
            .with_temperature(0.0)
            .with_max_tokens(64);

        assert_eq!(request.system.as_deref(), Some("Be brief"));
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.max_tokens, Some(64));
        assert_eq!(request.effective_timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_usage_totals() {
        let usage = LlmUsage::new(12, 30);
        assert_eq!(usage.total_tokens, 42);

        // counts come from remote JSON
        let usage = LlmUsage::new(u32::MAX, 5);
        assert_eq!(usage.total_tokens, u32::MAX);
    }

    #[tokio::test]
    async fn test_complete_with_timeout_expires() {
        let client = MockLlmClient::replying("late").with_delay(Duration::from_millis(200));
        let result = complete_with_timeout(
            &client,
            LlmRequest::new("q", "m"),
            Duration::from_millis(20),
        )
        .await;

        assert!(matches!(result, Err(AppError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_complete_with_timeout_passes_through() {
        let client = MockLlmClient::replying("on time");
        let response = complete_with_timeout(
            &client,
            LlmRequest::new("q", "m"),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        assert_eq!(response.content, "on time");
    }
}
