//! Retrieval adapter: one similarity index per source.

use crate::embeddings::EmbeddingProvider;
use crate::types::{DocumentRecord, Evidence, SourceType};
use crate::vector_index::{InMemoryIndex, VectorIndex};
use docroute_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Owns the records of exactly one source and answers top-k queries.
///
/// Built once, then read-only: `search` never changes the index.
pub struct RetrievalAdapter {
    source_type: SourceType,
    records: Vec<Arc<DocumentRecord>>,
    index: Box<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    k: usize,
}

impl std::fmt::Debug for RetrievalAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalAdapter")
            .field("source_type", &self.source_type)
            .field("records", &self.records.len())
            .field("k", &self.k)
            .field("embedder", &self.embedder.provider_name())
            .finish()
    }
}

impl RetrievalAdapter {
    /// Embed `records` and build the index.
    ///
    /// Fails with [`AppError::EmptyCorpus`] when `records` is empty and
    /// [`AppError::InvalidSource`] when `k` is zero.
    pub async fn build(
        source_type: SourceType,
        records: Vec<DocumentRecord>,
        k: usize,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> AppResult<Self> {
        if records.is_empty() {
            return Err(AppError::EmptyCorpus(source_type.to_string()));
        }
        if k == 0 {
            return Err(AppError::InvalidSource(format!(
                "Source '{}' must retrieve at least one record",
                source_type
            )));
        }

        let texts: Vec<String> = records.iter().map(|r| r.content.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;
        if embeddings.len() != records.len() {
            return Err(AppError::Embedding(format!(
                "Expected {} embeddings for '{}', got {}",
                records.len(),
                source_type,
                embeddings.len()
            )));
        }

        let mut index = InMemoryIndex::new(embedder.dimensions());
        for embedding in embeddings {
            index.insert(embedding)?;
        }

        tracing::info!(
            "Built '{}' index: {} records, k={}",
            source_type,
            records.len(),
            k
        );

        Ok(Self {
            source_type,
            records: records.into_iter().map(Arc::new).collect(),
            index: Box::new(index),
            embedder,
            k,
        })
    }

    /// Assemble an adapter around an existing index, for tests that need
    /// control over what the index returns.
    #[cfg(test)]
    pub(crate) fn with_index(
        source_type: SourceType,
        records: Vec<DocumentRecord>,
        index: Box<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        k: usize,
    ) -> Self {
        Self {
            source_type,
            records: records.into_iter().map(Arc::new).collect(),
            index,
            embedder,
            k,
        }
    }

    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    /// Result count per search.
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Top-k records for `query`, best first, at most `k` of them.
    ///
    /// Embedding the query is the only external call and is bounded by
    /// `timeout`.
    pub async fn search(&self, query: &str, timeout: Duration) -> AppResult<Vec<Evidence>> {
        let query_embedding = tokio::time::timeout(timeout, self.embedder.embed(query))
            .await
            .map_err(|_| AppError::Timeout(timeout))??;

        let hits = self.index.search(&query_embedding, self.k)?;

        let evidence: Vec<Evidence> = hits
            .into_iter()
            .filter_map(|(pos, score)| {
                self.records.get(pos).map(|record| Evidence {
                    record: Arc::clone(record),
                    score,
                })
            })
            .collect();

        tracing::debug!(
            "Search in '{}' returned {} records (top score: {:.3})",
            self.source_type,
            evidence.len(),
            evidence.first().map(|e| e.score).unwrap_or(0.0)
        );

        Ok(evidence)
    }
}
