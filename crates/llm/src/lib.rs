//! Completion-service integration for docroute.
//!
//! This crate provides a provider-agnostic abstraction over text-completion
//! services. The router and the answer synthesizer only ever see the
//! [`LlmClient`] trait.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **OpenAI-compatible**: OpenAI, OpenRouter and any `/chat/completions` endpoint
//! - **Mock**: Scripted client for tests and offline runs
//!
//! # Example
//! ```no_run
//! use docroute_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{complete_with_timeout, LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{MockLlmClient, OllamaClient, OpenAiClient};
pub use types::ProviderType;
