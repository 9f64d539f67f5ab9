//! Session configuration
//!
//! Loaded from YAML or JSON. Every section has defaults, so an empty file
//! (or no file) gives a working local setup with the hashing embedder.

use crate::vector::DistanceMetric;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV: &str = "SEMDEX_API_KEY";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemdexConfig {
    pub index: IndexConfig,
    pub embed: EmbedConfig,
    pub pipeline: PipelineConfig,
}

/// Vector index settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Distance metric used for ranking
    pub metric: DistanceMetric,
    /// Fix the embedding dimension up front instead of at the first build
    pub dimension: Option<usize>,
}

/// Embedding provider backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local feature-hashing model, no network
    #[default]
    Hashing,
    #[serde(rename = "openai")]
    OpenAI,
    Ollama,
}

/// Embedding provider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    pub provider: ProviderKind,
    /// Model name (e.g. "text-embedding-3-small", "nomic-embed-text")
    pub model: Option<String>,
    /// API key (falls back to SEMDEX_API_KEY, then OPENAI_API_KEY)
    pub api_key: Option<String>,
    /// API base URL (defaults per provider)
    pub api_base_url: Option<String>,
    /// Embedding dimension D
    pub dimensions: usize,
    /// HTTP request timeout
    pub timeout_secs: u64,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Hashing,
            model: None,
            api_key: None,
            api_base_url: None,
            dimensions: 384,
            timeout_secs: 30,
        }
    }
}

impl EmbedConfig {
    /// Configured model, or the provider's default
    pub fn model_name(&self) -> &str {
        match (&self.model, self.provider) {
            (Some(model), _) => model.as_str(),
            (None, ProviderKind::Hashing) => "feature-hash",
            (None, ProviderKind::OpenAI) => "text-embedding-3-small",
            (None, ProviderKind::Ollama) => "nomic-embed-text",
        }
    }

    /// Configured key, or one from the environment
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
    }
}

/// Build and query pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Neighbors returned per query
    pub top_k: usize,
    /// Embedding calls in flight during a build
    pub embed_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: crate::pipeline::DEFAULT_TOP_K,
            embed_concurrency: 8,
        }
    }
}

impl SemdexConfig {
    /// Load from a `.yaml`/`.yml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: SemdexConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            other => {
                return Err(ConfigError::Invalid(format!(
                    "unsupported config extension: {:?}",
                    other
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML text
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let config: SemdexConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.embed.dimensions == 0 {
            return Err(ConfigError::Invalid("embed.dimensions must be positive".to_string()));
        }
        match self.index.dimension {
            Some(0) => {
                return Err(ConfigError::Invalid("index.dimension must be positive".to_string()));
            }
            Some(d) if d != self.embed.dimensions => {
                return Err(ConfigError::Invalid(format!(
                    "index.dimension ({}) does not match embed.dimensions ({})",
                    d, self.embed.dimensions
                )));
            }
            _ => {}
        }
        if self.pipeline.top_k == 0 {
            return Err(ConfigError::Invalid("pipeline.top_k must be positive".to_string()));
        }
        if self.pipeline.embed_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.embed_concurrency must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
