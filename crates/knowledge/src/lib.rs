//! Document routing and retrieval-augmented answering.
//!
//! Documents are loaded per type (PDF, DOCX, CSV), indexed in memory, and
//! each question is routed by a language model to the one source whose
//! description fits best, or answered from general knowledge when none does.
//!
//! ```no_run
//! use docroute_core::AppConfig;
//! use docroute_knowledge::SearchEngine;
//!
//! # async fn example() -> docroute_core::AppResult<()> {
//! let config = AppConfig::load()?;
//! let engine = SearchEngine::from_config(&config).await?;
//! let answer = engine.query("What were Q3 sales?").await?;
//! println!("[{}] {}", answer.used_source, answer.text);
//! # Ok(())
//! # }
//! ```

pub mod chunker;
pub mod embeddings;
pub mod engine;
pub mod loader;
pub mod parser;
pub mod registry;
pub mod retrieval;
pub mod router;
pub mod synthesizer;
pub mod types;
pub mod vector_index;

pub use engine::{EngineOptions, SearchEngine, SourceInfo};
pub use loader::{DocumentLoader, FsLoader, LoadSummary, LoadedDocuments};
pub use registry::{SourceDescriptor, SourceRegistry};
pub use retrieval::RetrievalAdapter;
pub use router::Router;
pub use synthesizer::Synthesizer;
pub use types::{
    Answer, DocumentRecord, Evidence, RouteTarget, RouterDecision, SourceType,
    CONFIDENCE_THRESHOLD,
};
