//! Configuration management for docroute.
//!
//! Configuration is layered, later layers winning:
//! - Built-in defaults
//! - Config file (`.docroute/config.yaml` in the workspace, or `--config`)
//! - Environment variables
//! - Command-line flags

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Completion providers the client factory knows how to build.
pub const KNOWN_PROVIDERS: [&str; 3] = ["ollama", "openai", "openrouter"];

/// Embedding providers the embedding factory knows how to build.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 2] = ["trigram", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .docroute/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Directory scanned for PDF, DOCX and CSV files
    pub documents: PathBuf,

    /// Completion provider ("ollama", "openai", "openrouter")
    pub provider: String,

    /// Completion model identifier
    pub model: String,

    /// Custom completion endpoint
    pub endpoint: Option<String>,

    /// Explicit API key (takes precedence over `api_key_env`)
    pub api_key: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: Option<String>,

    /// Sampling temperature for every completion call
    pub temperature: f32,

    /// Deadline for each external call, in seconds
    pub timeout_secs: u64,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Embedding settings
    pub embedding: EmbeddingSettings,

    /// Chunking settings for narrative documents
    pub chunking: ChunkSettings,

    /// Per-source routing descriptions and result counts
    pub sources: SourceSettings,
}

/// Embedding provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
        }
    }
}

/// Character chunking applied to PDF and DOCX text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChunkSettings {
    #[serde(rename = "chunkSize")]
    pub chunk_size: usize,
    #[serde(rename = "chunkOverlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
        }
    }
}

/// Routing description and result count for one source type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSetting {
    pub description: String,
    pub k: usize,
}

/// Settings for every supported source type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSettings {
    pub pdf: SourceSetting,
    pub docx: SourceSetting,
    pub tabular: SourceSetting,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            pdf: SourceSetting {
                description: "The pdf document is all about iphone, iphone 17 series launch. \
                    Good for answering questions about PDF documents, reports, articles, papers, \
                    documentation, manuals, and textual information stored in PDF format"
                    .to_string(),
                k: 5,
            },
            docx: SourceSetting {
                description: "The word document is all about F1 Singapore Grand Prix 2025. \
                    Good for answering questions about Word documents, letters, memos, proposals, \
                    written content, formatted documents, and business documents stored in DOCX format"
                    .to_string(),
                k: 5,
            },
            tabular: SourceSetting {
                description: "The csv document is all about sales data of a company. \
                    Good for answering questions about tabular data, spreadsheets, sales records, \
                    orders, numerical data, statistics, transactions, customer data, and structured \
                    data stored in CSV format"
                    .to_string(),
                k: 10,
            },
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSection>,
    embedding: Option<EmbeddingSettings>,
    documents: Option<DocumentsSection>,
    sources: Option<SourcesSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LlmSection {
    provider: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
    #[serde(rename = "apiKeyEnv")]
    api_key_env: Option<String>,
    temperature: Option<f32>,
    #[serde(rename = "timeoutSecs")]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocumentsSection {
    path: Option<String>,
    #[serde(rename = "chunkSize")]
    chunk_size: Option<usize>,
    #[serde(rename = "chunkOverlap")]
    chunk_overlap: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SourcesSection {
    pdf: Option<PartialSource>,
    docx: Option<PartialSource>,
    tabular: Option<PartialSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PartialSource {
    description: Option<String>,
    k: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let workspace = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            documents: workspace.clone(),
            workspace,
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            endpoint: None,
            api_key: None,
            api_key_env: None,
            temperature: 0.0,
            timeout_secs: 60,
            log_level: None,
            verbose: false,
            no_color: false,
            embedding: EmbeddingSettings::default(),
            chunking: ChunkSettings::default(),
            sources: SourceSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and environment variables.
    ///
    /// Environment variables:
    /// - `DOCROUTE_WORKSPACE`: Override workspace path
    /// - `DOCROUTE_CONFIG`: Path to config file
    /// - `DOCROUTE_DOCUMENTS`: Directory holding the documents
    /// - `DOCROUTE_PROVIDER`: Completion provider
    /// - `DOCROUTE_MODEL`: Model identifier
    /// - `DOCROUTE_ENDPOINT`: Completion endpoint
    /// - `DOCROUTE_API_KEY`: API key
    /// - `DOCROUTE_TIMEOUT_SECS`: Per-call deadline
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`AppConfig::load`], with an explicit workspace and config file
    /// taking precedence over `DOCROUTE_WORKSPACE` and `DOCROUTE_CONFIG`.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        let workspace = workspace.or_else(|| {
            std::env::var("DOCROUTE_WORKSPACE")
                .ok()
                .map(PathBuf::from)
        });
        if let Some(workspace) = workspace {
            config.workspace = workspace;
            config.documents = config.workspace.clone();
        }

        config.config_file =
            config_file.or_else(|| std::env::var("DOCROUTE_CONFIG").ok().map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.workspace.join(".docroute/config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        config.apply_env()?;
        Ok(config)
    }

    /// Environment variables override the YAML config.
    fn apply_env(&mut self) -> AppResult<()> {
        if let Ok(documents) = std::env::var("DOCROUTE_DOCUMENTS") {
            self.documents = PathBuf::from(documents);
        }

        if let Ok(provider) = std::env::var("DOCROUTE_PROVIDER") {
            self.provider = provider;
        }

        if let Ok(model) = std::env::var("DOCROUTE_MODEL") {
            self.model = model;
        }

        if let Ok(endpoint) = std::env::var("DOCROUTE_ENDPOINT") {
            self.endpoint = Some(endpoint);
        }

        if let Ok(key) = std::env::var("DOCROUTE_API_KEY") {
            self.api_key = Some(key);
        }

        if let Ok(secs) = std::env::var("DOCROUTE_TIMEOUT_SECS") {
            self.timeout_secs = secs.parse().map_err(|_| {
                AppError::Config(format!("DOCROUTE_TIMEOUT_SECS is not a number: {}", secs))
            })?;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            self.no_color = true;
        }

        Ok(())
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(llm) = config_file.llm {
            if let Some(provider) = llm.provider {
                result.provider = provider;
            }
            if let Some(model) = llm.model {
                result.model = model;
            }
            if llm.endpoint.is_some() {
                result.endpoint = llm.endpoint;
            }
            if llm.api_key_env.is_some() {
                result.api_key_env = llm.api_key_env;
            }
            if let Some(temperature) = llm.temperature {
                result.temperature = temperature;
            }
            if let Some(timeout) = llm.timeout_secs {
                result.timeout_secs = timeout;
            }
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        if let Some(documents) = config_file.documents {
            if let Some(path) = documents.path {
                let path = PathBuf::from(path);
                // Relative paths are resolved against the workspace
                result.documents = if path.is_absolute() {
                    path
                } else {
                    result.workspace.join(path)
                };
            }
            if let Some(size) = documents.chunk_size {
                result.chunking.chunk_size = size;
            }
            if let Some(overlap) = documents.chunk_overlap {
                result.chunking.chunk_overlap = overlap;
            }
        }

        if let Some(sources) = config_file.sources {
            merge_source(&mut result.sources.pdf, sources.pdf);
            merge_source(&mut result.sources.docx, sources.docx);
            merge_source(&mut result.sources.tabular, sources.tabular);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Flags take precedence over both the config file and the environment.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        documents: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            // Documents follow the workspace unless set separately
            if self.documents == self.workspace {
                self.documents = workspace.clone();
            }
            self.workspace = workspace;
        }

        if let Some(documents) = documents {
            self.documents = documents;
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Deadline applied to each external call.
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }

    /// Resolve the API key for the active provider.
    ///
    /// Order: explicit key, configured env var, provider default env var.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        let env_var = self
            .api_key_env
            .clone()
            .or_else(|| default_api_key_env(&self.provider).map(str::to_string))?;

        std::env::var(env_var).ok()
    }

    /// Validate configuration before the engine is built.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.provider.to_lowercase();
        if !KNOWN_PROVIDERS.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        let embedding = self.embedding.provider.to_lowercase();
        if !KNOWN_EMBEDDING_PROVIDERS.contains(&embedding.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be positive".to_string(),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(AppError::Config("Timeout must be at least 1 second".to_string()));
        }

        if self.chunking.chunk_size == 0 || self.chunking.chunk_overlap >= self.chunking.chunk_size
        {
            return Err(AppError::Config(format!(
                "Invalid chunking: size {} with overlap {}",
                self.chunking.chunk_size, self.chunking.chunk_overlap
            )));
        }

        for (name, setting) in [
            ("pdf", &self.sources.pdf),
            ("docx", &self.sources.docx),
            ("tabular", &self.sources.tabular),
        ] {
            if setting.k == 0 {
                return Err(AppError::Config(format!(
                    "Source '{}' must retrieve at least one result (k = 0)",
                    name
                )));
            }
        }

        if provider != "ollama" && self.resolve_api_key().is_none() {
            return Err(AppError::Config(format!(
                "Provider '{}' requires an API key (set DOCROUTE_API_KEY or {})",
                self.provider,
                self.api_key_env
                    .as_deref()
                    .or_else(|| default_api_key_env(&provider))
                    .unwrap_or("apiKeyEnv")
            )));
        }

        Ok(())
    }
}

fn merge_source(target: &mut SourceSetting, partial: Option<PartialSource>) {
    if let Some(partial) = partial {
        if let Some(description) = partial.description {
            target.description = description;
        }
        if let Some(k) = partial.k {
            target.k = k;
        }
    }
}

fn default_api_key_env(provider: &str) -> Option<&'static str> {
    match provider.to_lowercase().as_str() {
        "openrouter" => Some("OPENROUTER_API_KEY"),
        "openai" => Some("OPENAI_API_KEY"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.sources.pdf.k, 5);
        assert_eq!(config.sources.docx.k, 5);
        assert_eq!(config.sources.tabular.k, 10);
        assert!(!config.verbose);
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            Some(PathBuf::from("/tmp/ws")),
            None,
            Some("openrouter".to_string()),
            Some("openai/gpt-oss-20b:free".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.provider, "openrouter");
        assert_eq!(overridden.model, "openai/gpt-oss-20b:free");
        assert_eq!(overridden.documents, PathBuf::from("/tmp/ws"));
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
llm:
  provider: openrouter
  model: openai/gpt-oss-20b:free
  apiKeyEnv: MY_KEY
  timeoutSecs: 15
documents:
  path: docs
  chunkSize: 500
sources:
  tabular:
    k: 20
  pdf:
    description: Phone launch brochure
logging:
  color: false
"#,
        )
        .unwrap();

        let mut base = AppConfig::default();
        base.workspace = temp.path().to_path_buf();
        let merged = base.merge_yaml(&path).unwrap();

        assert_eq!(merged.provider, "openrouter");
        assert_eq!(merged.api_key_env.as_deref(), Some("MY_KEY"));
        assert_eq!(merged.timeout_secs, 15);
        assert_eq!(merged.documents, temp.path().join("docs"));
        assert_eq!(merged.chunking.chunk_size, 500);
        assert_eq!(merged.chunking.chunk_overlap, 100);
        assert_eq!(merged.sources.tabular.k, 20);
        assert_eq!(merged.sources.pdf.description, "Phone launch brochure");
        assert_eq!(merged.sources.pdf.k, 5);
        assert!(merged.no_color);
    }

    #[test]
    fn test_load_from_workspace_reads_config_yaml() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".docroute")).unwrap();
        std::fs::write(
            temp.path().join(".docroute/config.yaml"),
            "sources:\n  docx:\n    k: 7\n",
        )
        .unwrap();

        let config = AppConfig::load_from(Some(temp.path().to_path_buf()), None).unwrap();
        assert_eq!(config.workspace, temp.path());
        assert_eq!(config.sources.docx.k, 7);
    }

    #[test]
    fn test_load_from_missing_workspace() {
        let temp = TempDir::new().unwrap();
        let result = AppConfig::load_from(Some(temp.path().join("absent")), None);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ollama() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_k() {
        let mut config = AppConfig::default();
        config.sources.docx.k = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("docx"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = AppConfig::default();
        config.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_api_key_wins() {
        let mut config = AppConfig::default();
        config.provider = "openrouter".to_string();
        config.api_key = Some("sk-test".to_string());
        assert_eq!(config.resolve_api_key().as_deref(), Some("sk-test"));
        assert!(config.validate().is_ok());
    }
}
