//! Document loading from a directory.
//!
//! The loader is the only place that touches document files. It stamps
//! every record with its [`SourceType`] and tolerates per-file failures.

use crate::chunker::chunk_text;
use crate::parser;
use crate::types::{DocumentRecord, SourceType};
use docroute_core::config::ChunkSettings;
use docroute_core::{AppError, AppResult};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Records loaded from a directory, grouped by source type.
#[derive(Debug, Clone, Default)]
pub struct LoadedDocuments {
    records: BTreeMap<SourceType, Vec<DocumentRecord>>,
    files_loaded: usize,
    skipped: Vec<PathBuf>,
}

impl LoadedDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append records for one source type.
    pub fn extend(&mut self, source_type: SourceType, records: Vec<DocumentRecord>) {
        self.records.entry(source_type).or_default().extend(records);
    }

    /// Records for one source type; empty if none were loaded.
    pub fn get(&self, source_type: SourceType) -> &[DocumentRecord] {
        self.records
            .get(&source_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Source types with at least one record, in registration order.
    pub fn non_empty_types(&self) -> Vec<SourceType> {
        self.records
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(source_type, _)| *source_type)
            .collect()
    }

    /// Take every group out, in registration order.
    pub fn into_groups(self) -> impl Iterator<Item = (SourceType, Vec<DocumentRecord>)> {
        self.records.into_iter()
    }

    /// Files that failed to load.
    pub fn skipped(&self) -> &[PathBuf] {
        &self.skipped
    }

    pub fn summary(&self) -> LoadSummary {
        LoadSummary {
            records: SourceType::ALL
                .iter()
                .map(|t| (*t, self.get(*t).len()))
                .collect(),
            files_loaded: self.files_loaded,
            files_skipped: self.skipped.len(),
        }
    }
}

/// Per-type record counts from one load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub records: BTreeMap<SourceType, usize>,
    pub files_loaded: usize,
    pub files_skipped: usize,
}

impl LoadSummary {
    pub fn total_records(&self) -> usize {
        self.records.values().sum()
    }
}

impl fmt::Display for LoadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Document loading summary")?;
        for (source_type, count) in &self.records {
            writeln!(f, "  {:<8} {} records", source_type.as_str(), count)?;
        }
        write!(
            f,
            "  files    {} loaded, {} skipped",
            self.files_loaded, self.files_skipped
        )
    }
}

/// Ingestion collaborator: turns a directory into document records.
#[async_trait::async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(&self, directory: &Path) -> AppResult<LoadedDocuments>;
}

/// Loads `*.pdf`, `*.docx` and `*.csv` from the top level of a directory.
#[derive(Debug, Clone, Default)]
pub struct FsLoader {
    chunking: ChunkSettings,
}

impl FsLoader {
    pub fn new(chunking: ChunkSettings) -> Self {
        Self { chunking }
    }
}

#[async_trait::async_trait]
impl DocumentLoader for FsLoader {
    async fn load(&self, directory: &Path) -> AppResult<LoadedDocuments> {
        let directory = directory.to_path_buf();
        let chunking = self.chunking;

        // pdf extraction is CPU-bound
        tokio::task::spawn_blocking(move || load_directory(&directory, chunking))
            .await
            .map_err(|e| AppError::Ingest(format!("Loader task failed: {}", e)))?
    }
}

fn load_directory(directory: &Path, chunking: ChunkSettings) -> AppResult<LoadedDocuments> {
    if !directory.is_dir() {
        return Err(AppError::Ingest(format!(
            "Documents directory {:?} does not exist",
            directory
        )));
    }

    let mut files: Vec<(PathBuf, SourceType)> = walkdir::WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let source_type = e
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(SourceType::from_extension)?;
            Some((e.into_path(), source_type))
        })
        .collect();
    files.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

    tracing::info!("Found {} document files in {:?}", files.len(), directory);

    let mut loaded = LoadedDocuments::new();
    for (path, source_type) in files {
        match load_file(&path, source_type, chunking) {
            Ok(records) => {
                tracing::debug!("Loaded {} records from {:?}", records.len(), path);
                loaded.files_loaded += 1;
                loaded.extend(source_type, records);
            }
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", path, e);
                loaded.skipped.push(path);
            }
        }
    }

    let summary = loaded.summary();
    tracing::info!(
        "Loaded {} records from {} files ({} skipped)",
        summary.total_records(),
        summary.files_loaded,
        summary.files_skipped
    );

    Ok(loaded)
}

fn load_file(
    path: &Path,
    source_type: SourceType,
    chunking: ChunkSettings,
) -> AppResult<Vec<DocumentRecord>> {
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let records = match source_type {
        SourceType::Pdf => {
            let mut records = Vec::new();
            for (page_idx, page) in parser::extract_pdf_pages(&bytes)?.iter().enumerate() {
                let page_no = page_idx + 1;
                for (chunk_idx, chunk) in
                    chunk_text(page, chunking.chunk_size, chunking.chunk_overlap)
                        .into_iter()
                        .enumerate()
                {
                    records.push(
                        DocumentRecord::new(
                            chunk,
                            source_type,
                            format!("{}#page={}", file_name, page_no),
                        )
                        .with_metadata("source", file_name.as_str())
                        .with_metadata("page", page_no)
                        .with_metadata("chunk", chunk_idx),
                    );
                }
            }
            records
        }
        SourceType::Docx => {
            let text = parser::extract_docx_text(&bytes)?;
            chunk_text(&text, chunking.chunk_size, chunking.chunk_overlap)
                .into_iter()
                .enumerate()
                .map(|(chunk_idx, chunk)| {
                    DocumentRecord::new(
                        chunk,
                        source_type,
                        format!("{}#chunk={}", file_name, chunk_idx),
                    )
                    .with_metadata("source", file_name.as_str())
                    .with_metadata("chunk", chunk_idx)
                })
                .collect()
        }
        SourceType::Tabular => parser::parse_csv_rows(&bytes)?
            .into_iter()
            .map(|(row, content)| {
                DocumentRecord::new(content, source_type, format!("{}#row={}", file_name, row))
                    .with_metadata("source", file_name.as_str())
                    .with_metadata("row", row)
            })
            .collect(),
    };

    if records.is_empty() {
        tracing::warn!("{:?} contains no extractable text", path);
    }

    Ok(records)
}
