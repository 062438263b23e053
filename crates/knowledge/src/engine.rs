//! Search engine facade: initialize once, then answer queries.

use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::loader::{DocumentLoader, FsLoader, LoadSummary};
use crate::registry::SourceRegistry;
use crate::retrieval::RetrievalAdapter;
use crate::router::Router;
use crate::synthesizer::Synthesizer;
use crate::types::{Answer, SourceType};
use docroute_core::config::SourceSettings;
use docroute_core::{AppConfig, AppError, AppResult};
use docroute_llm::{create_client, LlmClient};
use docroute_prompt::{load_prompt, GENERAL_PROMPT_ID, GROUNDED_PROMPT_ID, ROUTER_PROMPT_ID};
use futures::future::try_join_all;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Everything `initialize` needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Directory holding the documents
    pub documents: PathBuf,

    /// Workspace used for prompt overrides
    pub workspace: PathBuf,

    /// Description and k per source type
    pub sources: SourceSettings,

    /// Completion model
    pub model: String,

    pub temperature: f32,

    /// Default per-call deadline for queries
    pub timeout: Duration,
}

impl EngineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            documents: config.documents.clone(),
            workspace: config.workspace.clone(),
            sources: config.sources.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout: config.timeout(),
        }
    }

    fn source_setting(&self, source_type: SourceType) -> (&str, usize) {
        let setting = match source_type {
            SourceType::Pdf => &self.sources.pdf,
            SourceType::Docx => &self.sources.docx,
            SourceType::Tabular => &self.sources.tabular,
        };
        (&setting.description, setting.k)
    }
}

/// Summary of one registered source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub name: String,
    pub description: String,
    pub k: usize,
    pub records: usize,
}

struct EngineInner {
    registry: SourceRegistry,
    router: Router,
    synthesizer: Synthesizer,
    timeout: Duration,
    load_summary: LoadSummary,
}

/// Routes questions to document sources and answers them.
///
/// All state is built by [`SearchEngine::initialize`] and read-only
/// afterwards; clones share it and may be queried concurrently.
#[derive(Clone)]
pub struct SearchEngine {
    inner: Arc<EngineInner>,
}

impl SearchEngine {
    /// Load documents, build one index per non-empty source type and wire
    /// the router and synthesizer.
    ///
    /// Source types without records are never registered. Any setup error
    /// aborts initialization.
    pub async fn initialize(
        options: EngineOptions,
        loader: &dyn DocumentLoader,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmClient>,
    ) -> AppResult<Self> {
        let start = Instant::now();
        tracing::info!("Initializing engine from {:?}", options.documents);

        let router_prompt = load_prompt(&options.workspace, ROUTER_PROMPT_ID)?;
        let grounded_prompt = load_prompt(&options.workspace, GROUNDED_PROMPT_ID)?;
        let general_prompt = load_prompt(&options.workspace, GENERAL_PROMPT_ID)?;

        let loaded = loader.load(&options.documents).await?;
        let load_summary = loaded.summary();

        let builds = loaded
            .into_groups()
            .filter(|(_, records)| !records.is_empty())
            .map(|(source_type, records)| {
                let (_, k) = options.source_setting(source_type);
                RetrievalAdapter::build(source_type, records, k, Arc::clone(&embedder))
            });
        let adapters = try_join_all(builds).await?;

        let mut registry = SourceRegistry::new();
        for adapter in adapters {
            let source_type = adapter.source_type();
            let (description, _) = options.source_setting(source_type);
            registry.register(source_type.as_str(), description, Arc::new(adapter))?;
        }

        if registry.is_empty() {
            tracing::warn!(
                "No documents found in {:?}; every question will be answered from general knowledge",
                options.documents
            );
        }

        let router = Router::new(
            Arc::clone(&llm),
            router_prompt,
            options.model.clone(),
            options.temperature,
        );
        let synthesizer = Synthesizer::new(
            llm,
            grounded_prompt,
            general_prompt,
            options.model.clone(),
            options.temperature,
        );

        tracing::info!(
            "Engine ready: {} sources in {:.2}s",
            registry.len(),
            start.elapsed().as_secs_f64()
        );

        Ok(Self {
            inner: Arc::new(EngineInner {
                registry,
                router,
                synthesizer,
                timeout: options.timeout,
                load_summary,
            }),
        })
    }

    /// Build the collaborators from configuration and initialize.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        let api_key = config.resolve_api_key();
        let llm = create_client(
            &config.provider,
            config.endpoint.as_deref(),
            api_key.as_deref(),
        )
        .map_err(AppError::Config)?;
        let embedder = create_provider(&config.embedding).await?;
        let loader = FsLoader::new(config.chunking);

        Self::initialize(EngineOptions::from_config(config), &loader, embedder, llm).await
    }

    /// Answer a question using the configured timeout.
    pub async fn query(&self, text: &str) -> AppResult<Answer> {
        self.query_with_timeout(text, self.inner.timeout).await
    }

    /// Answer a question, bounding each external call by `timeout`.
    ///
    /// A failed query leaves the engine usable.
    pub async fn query_with_timeout(&self, text: &str, timeout: Duration) -> AppResult<Answer> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::InvalidQuery("Question cannot be empty".to_string()));
        }

        let inner = &self.inner;
        let decision = inner
            .router
            .route(text, inner.registry.list_sources(), timeout)
            .await?;

        inner
            .synthesizer
            .synthesize(text, &decision, &inner.registry, timeout)
            .await
    }

    /// Registered sources in registration order.
    pub fn sources(&self) -> Vec<SourceInfo> {
        self.inner
            .registry
            .list_sources()
            .iter()
            .map(|s| SourceInfo {
                name: s.name.clone(),
                description: s.description.clone(),
                k: s.adapter.k(),
                records: s.adapter.len(),
            })
            .collect()
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.inner.registry
    }

    pub fn load_summary(&self) -> &LoadSummary {
        &self.inner.load_summary
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }
}
