//! Knowledge system type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Minimum score for high-confidence answering.
/// Scores below this trigger cautious language in the answer prompt.
pub const CONFIDENCE_THRESHOLD: f32 = 0.30;

/// Maximum snippet length for evidence previews.
pub const MAX_SNIPPET_LENGTH: usize = 150;

/// The kind of document a record was loaded from.
///
/// Ordering follows registration order: pdf, docx, then tabular.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Pdf,
    Docx,
    Tabular,
}

impl SourceType {
    /// Every source type, in registration order.
    pub const ALL: [SourceType; 3] = [SourceType::Pdf, SourceType::Docx, SourceType::Tabular];

    /// Detect the source type from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "csv" => Some(Self::Tabular),
            _ => None,
        }
    }

    /// Registry name of the source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Tabular => "tabular",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of retrievable text. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Text content
    pub content: String,

    /// Stamped by the loader
    pub source_type: SourceType,

    /// Where the record came from, e.g. `sales.csv#row=3`
    pub origin: String,

    /// Loader-specific metadata (source file, page, chunk, row)
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl DocumentRecord {
    /// Create a record with empty metadata.
    pub fn new(
        content: impl Into<String>,
        source_type: SourceType,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            source_type,
            origin: origin.into(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Short preview of the content.
    pub fn snippet(&self) -> String {
        truncate_snippet(&self.content, MAX_SNIPPET_LENGTH)
    }
}

/// A retrieved record with its similarity score.
#[derive(Debug, Clone)]
pub struct Evidence {
    pub record: Arc<DocumentRecord>,
    pub score: f32,
}

/// Where a query is sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RouteTarget {
    /// A registered source, by name
    Source(String),
    /// No source fits; answer from general knowledge
    Default,
}

impl RouteTarget {
    /// Name as shown to users: the source name or `default`.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Source(name) => name,
            Self::Default => "default",
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }
}

impl fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of routing one query.
#[derive(Debug, Clone, PartialEq)]
pub struct RouterDecision {
    /// Selected source or default
    pub target: RouteTarget,

    /// Raw model reply the decision was parsed from
    pub rationale: String,

    /// Revised question to use for retrieval, if the model offered one
    pub next_input: Option<String>,
}

impl RouterDecision {
    /// A default decision with an explanation.
    pub fn default_route(rationale: impl Into<String>) -> Self {
        Self {
            target: RouteTarget::Default,
            rationale: rationale.into(),
            next_input: None,
        }
    }
}

/// Final answer to a query.
#[derive(Debug, Clone)]
pub struct Answer {
    /// Answer text, never empty
    pub text: String,

    /// Source that actually supplied evidence, or default
    pub used_source: RouteTarget,

    /// Evidence used, best first
    pub evidence: Vec<Evidence>,

    /// Best evidence score fell below [`CONFIDENCE_THRESHOLD`]
    pub low_confidence: bool,
}

impl Answer {
    /// Highest evidence score, or 0.0 without evidence.
    pub fn max_score(&self) -> f32 {
        self.evidence.first().map(|e| e.score).unwrap_or(0.0)
    }
}

/// Truncate text on a word boundary, appending `...`.
pub fn truncate_snippet(text: &str, max_len: usize) -> String {
    let text = text.trim();
    if text.len() <= max_len {
        return text.to_string();
    }

    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let truncated = &text[..end];
    match truncated.rfind(char::is_whitespace) {
        Some(last_space) if last_space > 0 => format!("{}...", &truncated[..last_space]),
        _ => format!("{}...", truncated),
    }
}
