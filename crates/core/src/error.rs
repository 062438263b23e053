//! Error types for docroute.
//!
//! One enum covers every failure category. Setup errors (bad sources, empty
//! corpora, broken configuration) abort engine initialization; query errors
//! are returned per call and never leave the engine in a broken state.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for docroute.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document loading and extraction errors
    #[error("Ingest error: {0}")]
    Ingest(String),

    /// A source was registered with an empty name or description
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    /// A source name was registered twice
    #[error("Source '{0}' is already registered")]
    DuplicateSource(String),

    /// A retrieval adapter was built from zero records
    #[error("Source '{0}' has no documents to index")]
    EmptyCorpus(String),

    /// The question itself cannot be processed
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Raw completion-service failures
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding-service failures
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// The router could not reach the completion service
    #[error("Router unavailable: {0}")]
    RouterUnavailable(String),

    /// An external call exceeded its deadline
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The answer could not be produced
    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error belongs to the one-time setup phase.
    ///
    /// Setup errors make the engine unusable until the cause is fixed;
    /// everything else is scoped to a single query.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            AppError::Config(_)
                | AppError::Ingest(_)
                | AppError::InvalidSource(_)
                | AppError::DuplicateSource(_)
                | AppError::EmptyCorpus(_)
                | AppError::Prompt(_)
        )
    }

    /// Whether this error is a deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, AppError::Timeout(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
