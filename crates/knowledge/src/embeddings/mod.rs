//! Embedding generation for document records and queries.
//!
//! Providers are selected by name from [`EmbeddingSettings`]:
//! `trigram` works offline, `ollama` calls a local Ollama server.
//!
//! [`EmbeddingSettings`]: docroute_core::config::EmbeddingSettings

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
pub use providers::{OllamaProvider, TrigramProvider};
