//! TOML configuration for docwindow.
//!
//! Loaded once per command by [`load_config`], which parses with `serde` and
//! then validates. Invalid configuration fails fast: no command runs with a
//! chunker, searcher, or provider it could not construct.
//!
//! Every section except `[db]` may be omitted and takes its defaults.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use docwindow_core::metadata::{CategoryPattern, MetadataExtractor};
use docwindow_core::search::SearcherSettings;

/// Config path used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "./config/docwindow.toml";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetadataConfig {
    #[serde(default = "default_category")]
    pub default_category: String,
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryPattern>,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            default_category: default_category(),
            categories: default_categories(),
        }
    }
}

impl MetadataConfig {
    pub fn extractor(&self) -> MetadataExtractor {
        MetadataExtractor::new(self.categories.clone(), self.default_category.clone())
    }
}

fn default_category() -> String {
    "general".to_string()
}
fn default_categories() -> Vec<CategoryPattern> {
    vec![
        CategoryPattern::new("table-context", "table-context"),
        CategoryPattern::new("experiment-readout", "experiment-readouts"),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_bm25_weight")]
    pub bm25_weight: f64,
    #[serde(default = "default_embedding_weight")]
    pub embedding_weight: f64,
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    #[serde(default = "default_context_categories")]
    pub context_categories: Vec<String>,
    #[serde(default = "default_storage_timeout_secs")]
    pub storage_timeout_secs: u64,
    #[serde(default = "default_embedding_timeout_secs")]
    pub embedding_timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            bm25_weight: default_bm25_weight(),
            embedding_weight: default_embedding_weight(),
            context_window: default_context_window(),
            context_categories: default_context_categories(),
            storage_timeout_secs: default_storage_timeout_secs(),
            embedding_timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_bm25_weight() -> f64 {
    0.3
}
fn default_embedding_weight() -> f64 {
    0.7
}
fn default_context_window() -> usize {
    2
}
fn default_context_categories() -> Vec<String> {
    vec!["table-context".to_string(), "experiment-readout".to_string()]
}
fn default_storage_timeout_secs() -> u64 {
    30
}
fn default_embedding_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub query_prefix: Option<String>,
    #[serde(default)]
    pub passage_prefix: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            query_prefix: None,
            passage_prefix: None,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_root")]
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
    #[serde(default)]
    pub source_url_base: Option<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            root: default_index_root(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
            source_url_base: None,
        }
    }
}

fn default_index_root() -> PathBuf {
    PathBuf::from("./docs")
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string(), "**/*.txt".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

impl Config {
    /// Searcher defaults derived from `[search]` and `[embedding]`.
    pub fn searcher_settings(&self) -> SearcherSettings {
        SearcherSettings {
            top_k: self.search.top_k,
            bm25_weight: self.search.bm25_weight,
            embedding_weight: self.search.embedding_weight,
            context_window: self.search.context_window,
            context_categories: self.search.context_categories.clone(),
            query_prefix: self.embedding.query_prefix.clone(),
            storage_timeout: Duration::from_secs(self.search.storage_timeout_secs),
            embedding_timeout: Duration::from_secs(self.search.embedding_timeout_secs),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.db.path.as_os_str().is_empty() {
        bail!("db.path must not be empty");
    }

    // Validate chunking
    if config.chunking.chunk_size == 0 {
        bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        bail!(
            "chunking.overlap ({}) must be < chunking.chunk_size ({})",
            config.chunking.overlap,
            config.chunking.chunk_size
        );
    }

    // Validate search
    if config.search.top_k < 1 {
        bail!("search.top_k must be >= 1");
    }
    for (name, w) in [
        ("bm25_weight", config.search.bm25_weight),
        ("embedding_weight", config.search.embedding_weight),
    ] {
        if !w.is_finite() || w < 0.0 {
            bail!("search.{} must be a finite, non-negative number", name);
        }
    }
    let sum = config.search.bm25_weight + config.search.embedding_weight;
    if (sum - 1.0).abs() > 1e-6 {
        tracing::warn!(
            bm25_weight = config.search.bm25_weight,
            embedding_weight = config.search.embedding_weight,
            "search weights do not sum to 1.0; combined scores are not normalized"
        );
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "disabled" | "ollama" | "openai" | "local" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, ollama, openai, or local.",
            other
        ),
    }
    if config.embedding.is_enabled() && config.embedding.model.is_none() {
        bail!(
            "embedding.model must be specified when provider is '{}'",
            config.embedding.provider
        );
    }
    if config.embedding.dims == Some(0) {
        bail!("embedding.dims must be > 0");
    }

    Ok(())
}
