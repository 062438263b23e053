//! OpenAI-compatible chat completion provider.
//!
//! Works against OpenAI itself and any service exposing the same
//! `/chat/completions` contract, such as OpenRouter.

use crate::client::{map_transport_error, LlmClient, LlmRequest, LlmResponse, LlmUsage};
use docroute_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

pub const OPENAI_URL: &str = "https://api.openai.com/v1";
pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1";

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Client for OpenAI-compatible endpoints.
pub struct OpenAiClient {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client for the given endpoint.
    ///
    /// `name` is reported as the provider name in logs.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    fn to_chat_request(&self, request: &LlmRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        ChatRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }

    fn convert_response(
        &self,
        request: &LlmRequest,
        response: ChatResponse,
    ) -> AppResult<LlmResponse> {
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::Llm(format!("{} returned no choices", self.name)))?;

        let usage = response
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: response.model.unwrap_or_else(|| request.model.clone()),
            usage,
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(skip(self, request), fields(provider = %self.name, model = %request.model))]
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!("Sending chat completion request");

        let url = format!("{}/chat/completions", self.base_url);
        let timeout = request.effective_timeout();

        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .bearer_auth(&self.api_key)
            .json(&self.to_chat_request(request))
            .send()
            .await
            .map_err(|e| map_transport_error(e, timeout, &self.name))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "{} API error ({}): {}",
                self.name, status, error_text
            )));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(timeout)
            } else {
                AppError::Llm(format!("Failed to parse {} response: {}", self.name, e))
            }
        })?;

        self.convert_response(request, chat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenAiClient {
        OpenAiClient::new("openrouter", OPENROUTER_URL, "sk-test")
    }

    #[test]
    fn test_chat_request_includes_system() {
        let request = LlmRequest::new("What were Q3 sales?", "openai/gpt-oss-20b:free")
            .with_system("Answer briefly")
            .with_temperature(0.0);

        let chat = client().to_chat_request(&request);
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0].role, "system");
        assert_eq!(chat.messages[1].content, "What were Q3 sales?");
        assert_eq!(chat.temperature, Some(0.0));
    }

    #[test]
    fn test_chat_request_without_system() {
        let chat = client().to_chat_request(&LlmRequest::new("hi", "m"));
        assert_eq!(chat.messages.len(), 1);
        assert_eq!(chat.messages[0].role, "user");
    }

    #[test]
    fn test_convert_response() {
        let raw: ChatResponse = serde_json::from_str(
            r#"{"model":"x","choices":[{"message":{"role":"assistant","content":"42"}}],"usage":{"prompt_tokens":3,"completion_tokens":1}}"#,
        )
        .unwrap();

        let response = client()
            .convert_response(&LlmRequest::new("q", "m"), raw)
            .unwrap();
        assert_eq!(response.content, "42");
        assert_eq!(response.model, "x");
        assert_eq!(response.usage.total_tokens, 4);
    }

    #[test]
    fn test_convert_response_without_choices() {
        let raw: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        let result = client().convert_response(&LlmRequest::new("q", "m"), raw);
        assert!(matches!(result, Err(AppError::Llm(_))));
    }

    #[test]
    fn test_base_url_trimmed() {
        let client = OpenAiClient::new("openai", "https://api.openai.com/v1/", "k");
        assert_eq!(client.base_url, OPENAI_URL);
        assert_eq!(client.provider_name(), "openai");
    }
}
