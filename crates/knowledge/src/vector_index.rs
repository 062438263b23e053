//! Vector index abstraction for record embeddings.
//!
//! Indexes store vectors by insertion position; callers keep the records
//! and map positions back to them.

use docroute_core::{AppError, AppResult};
use std::cmp::Ordering;

/// Trait for vector index backends.
///
/// Indexes are filled once and then only searched, so `search` takes
/// `&self` and must not change what later searches return.
pub trait VectorIndex: Send + Sync {
    /// Append a vector, returning its position.
    fn insert(&mut self, embedding: Vec<f32>) -> AppResult<usize>;

    /// Top-k positions by descending similarity.
    ///
    /// Equal scores keep insertion order.
    fn search(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<(usize, f32)>>;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Brute-force cosine similarity index held in memory.
#[derive(Debug, Clone)]
pub struct InMemoryIndex {
    dimensions: usize,
    vectors: Vec<Vec<f32>>,
}

impl InMemoryIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vectors: Vec::new(),
        }
    }

    fn check_dimensions(&self, vector: &[f32]) -> AppResult<()> {
        if vector.len() != self.dimensions {
            return Err(AppError::Embedding(format!(
                "Vector has {} dimensions, index expects {}",
                vector.len(),
                self.dimensions
            )));
        }
        Ok(())
    }
}

impl VectorIndex for InMemoryIndex {
    fn insert(&mut self, embedding: Vec<f32>) -> AppResult<usize> {
        self.check_dimensions(&embedding)?;
        self.vectors.push(embedding);
        Ok(self.vectors.len() - 1)
    }

    fn search(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<(usize, f32)>> {
        self.check_dimensions(query_embedding)?;

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(pos, vector)| (pos, cosine_similarity(query_embedding, vector)))
            .collect();

        // stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored)
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }
}

/// Cosine similarity; zero vectors score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
