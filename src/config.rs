use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::store::search::{SearchOptions, DEFAULT_OVERSAMPLE, DEFAULT_THRESHOLD, DEFAULT_TOP_K};
use crate::store::StorePaths;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct CvConfig {
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub index_path: String,
    pub metadata_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    /// Hugging Face repository under `sentence-transformers/`.
    pub model: String,
    pub cache_dir: String,
    /// Normalize document vectors at ingestion so scores are cosine similarities.
    pub normalize: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub relevance_threshold: f32,
    pub oversample: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let dir = default_data_dir();
        Self {
            index_path: dir.join("resume_index").to_string_lossy().into_owned(),
            metadata_path: dir.join("metadata.json").to_string_lossy().into_owned(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_data_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
            normalize: true,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            relevance_threshold: DEFAULT_THRESHOLD,
            oversample: DEFAULT_OVERSAMPLE,
        }
    }
}

/// Returns `~/.cvsearch/`, or `./.cvsearch/` when there is no home directory.
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cvsearch")
}

/// Returns the default config file path: `~/.cvsearch/config.toml`
pub fn default_config_path() -> PathBuf {
    default_data_dir().join("config.toml")
}

impl CvConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            CvConfig::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (CVSEARCH_INDEX, CVSEARCH_METADATA, CVSEARCH_LOG_LEVEL, CVSEARCH_THRESHOLD).
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("CVSEARCH_INDEX") {
            self.storage.index_path = val;
        }
        if let Ok(val) = std::env::var("CVSEARCH_METADATA") {
            self.storage.metadata_path = val;
        }
        if let Ok(val) = std::env::var("CVSEARCH_LOG_LEVEL") {
            self.logging.log_level = val;
        }
        if let Ok(val) = std::env::var("CVSEARCH_THRESHOLD") {
            self.retrieval.relevance_threshold = val
                .parse()
                .with_context(|| format!("CVSEARCH_THRESHOLD is not a number: {val}"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.retrieval.top_k > 0, "retrieval.top_k must be at least 1");
        anyhow::ensure!(
            self.retrieval.oversample > 0,
            "retrieval.oversample must be at least 1"
        );
        anyhow::ensure!(
            self.retrieval.relevance_threshold.is_finite(),
            "retrieval.relevance_threshold must be a finite number"
        );
        Ok(())
    }

    /// Resolved locations of the index and metadata files.
    pub fn store_paths(&self) -> StorePaths {
        StorePaths::new(
            expand_tilde(&self.storage.index_path),
            expand_tilde(&self.storage.metadata_path),
        )
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            top_k: self.retrieval.top_k,
            threshold: self.retrieval.relevance_threshold,
            oversample: self.retrieval.oversample,
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
