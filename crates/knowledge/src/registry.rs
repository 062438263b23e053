//! Source registry: the named sources the router chooses between.

use crate::retrieval::RetrievalAdapter;
use docroute_core::{AppError, AppResult};
use std::sync::Arc;

/// Name the router uses for "no source fits".
pub const DEFAULT_ROUTE_NAME: &str = "default";

/// A registered source.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    pub name: String,
    pub description: String,
    pub adapter: Arc<RetrievalAdapter>,
}

/// Write-once set of sources in registration order.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<SourceDescriptor>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source.
    ///
    /// Names must be non-blank, unique and must not collide with the
    /// reserved `default` route. A failed call leaves the registry
    /// unchanged.
    pub fn register(
        &mut self,
        name: &str,
        description: &str,
        adapter: Arc<RetrievalAdapter>,
    ) -> AppResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidSource(
                "Source name cannot be empty".to_string(),
            ));
        }
        if name.eq_ignore_ascii_case(DEFAULT_ROUTE_NAME) {
            return Err(AppError::InvalidSource(format!(
                "'{}' is reserved for the fallback route",
                name
            )));
        }
        if description.trim().is_empty() {
            return Err(AppError::InvalidSource(format!(
                "Source '{}' needs a description",
                name
            )));
        }
        if self.get(name).is_some() {
            return Err(AppError::DuplicateSource(name.to_string()));
        }

        tracing::debug!("Registered source '{}' ({} records)", name, adapter.len());

        self.sources.push(SourceDescriptor {
            name: name.to_string(),
            description: description.trim().to_string(),
            adapter,
        });
        Ok(())
    }

    /// Every registered source, in registration order.
    pub fn list_sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    /// Look up a source by exact name.
    pub fn get(&self, name: &str) -> Option<&SourceDescriptor> {
        self.sources.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
