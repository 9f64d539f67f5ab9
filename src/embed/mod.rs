//! Embedding providers
//!
//! A provider turns text into a fixed-length vector. Providers are created
//! once per session through a [`ProviderLoader`] and are stateless after
//! that, so a single instance serves every build and query.

pub mod client;
pub mod hashing;

use crate::config::{EmbedConfig, ProviderKind};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use client::{HttpEmbeddingProvider, HttpProviderLoader};
pub use hashing::{HashingEmbedder, HashingLoader};

/// Embed errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbedError {
    /// API error from the model provider
    #[error("Embedding API error: {0}")]
    ApiError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The provider returned a vector of the wrong length
    #[error("Unexpected embedding dimension: expected {expected}, got {got}")]
    UnexpectedDimension { expected: usize, got: usize },
}

pub type EmbedResult<T> = Result<T, EmbedError>;

/// Initialization errors for session resources
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    /// The index engine could not be instantiated
    #[error("Engine failed to load: {0}")]
    Engine(String),

    /// The embedding provider could not be loaded
    #[error("Embedding provider failed to load: {0}")]
    Provider(String),

    /// The provider's probe embedding had the wrong length
    #[error("Provider dimension probe failed: expected {expected}, got {got}")]
    DimensionProbe { expected: usize, got: usize },

    /// Invalid configuration for the resource
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A loaded embedding model
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text into a vector of length [`dimensions`](Self::dimensions)
    async fn embed(&self, text: &str) -> EmbedResult<Vec<f32>>;

    /// Embedding dimension D
    fn dimensions(&self) -> usize;

    /// Human-readable provider/model name
    fn name(&self) -> &str;
}

/// One-time async initializer for an embedding provider
#[async_trait]
pub trait ProviderLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn EmbeddingProvider>, LoadError>;
}

/// Pick the loader for the configured provider
pub fn loader_from_config(config: &EmbedConfig) -> Arc<dyn ProviderLoader> {
    match config.provider {
        ProviderKind::Hashing => Arc::new(HashingLoader::new(config.dimensions)),
        ProviderKind::OpenAI | ProviderKind::Ollama => {
            Arc::new(HttpProviderLoader::new(config.clone()))
        }
    }
}
