//! LLM provider factory.
//!
//! Builds a completion client from the provider name, an optional endpoint
//! and an optional API key.

use crate::client::LlmClient;
use crate::providers::openai::{OPENAI_URL, OPENROUTER_URL};
use crate::providers::{OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama", "openai", "openrouter")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key, required by hosted providers
///
/// # Errors
/// Returns an error message if the provider is unknown or a required
/// API key is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> Result<Arc<dyn LlmClient>, String> {
    let provider_type =
        ProviderType::parse(provider).ok_or_else(|| format!("Unknown provider: {}", provider))?;

    if provider_type.requires_api_key() && api_key.map_or(true, |k| k.trim().is_empty()) {
        return Err(format!(
            "Provider '{}' requires an API key",
            provider_type.as_str()
        ));
    }

    tracing::debug!(
        "Creating {} client (endpoint: {})",
        provider_type.as_str(),
        endpoint.unwrap_or("default")
    );

    match provider_type {
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or(crate::providers::ollama::DEFAULT_OLLAMA_URL);
            Ok(Arc::new(OllamaClient::with_base_url(base_url)))
        }
        ProviderType::OpenAI => Ok(Arc::new(OpenAiClient::new(
            "openai",
            endpoint.unwrap_or(OPENAI_URL),
            api_key.unwrap_or_default(),
        ))),
        ProviderType::OpenRouter => Ok(Arc::new(OpenAiClient::new(
            "openrouter",
            endpoint.unwrap_or(OPENROUTER_URL),
            api_key.unwrap_or_default(),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", None, None).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_ollama_with_custom_endpoint() {
        let client = create_client("ollama", Some("http://localhost:8080"), None);
        assert!(client.is_ok());
    }

    #[test]
    fn test_create_openrouter_client() {
        let client = create_client("openrouter", None, Some("sk-or-test")).unwrap();
        assert_eq!(client.provider_name(), "openrouter");
    }

    #[test]
    fn test_openrouter_requires_api_key() {
        match create_client("openrouter", None, None) {
            Err(err) => assert!(err.contains("requires an API key")),
            Ok(_) => panic!("Expected error for OpenRouter without API key"),
        }
    }

    #[test]
    fn test_blank_api_key_rejected() {
        assert!(create_client("openai", None, Some("  ")).is_err());
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("unknown", None, None) {
            Err(err) => assert!(err.contains("Unknown provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
