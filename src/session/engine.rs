//! Index engine instantiation

use crate::config::IndexConfig;
use crate::embed::LoadError;
use crate::vector::VectorIndex;
use async_trait::async_trait;
use std::sync::Arc;

/// One-time async initializer for the session's vector index
#[async_trait]
pub trait EngineLoader: Send + Sync {
    async fn instantiate(&self, config: &IndexConfig) -> Result<Arc<VectorIndex>, LoadError>;
}

/// Creates an empty in-memory [`VectorIndex`]
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryEngineLoader;

#[async_trait]
impl EngineLoader for InMemoryEngineLoader {
    async fn instantiate(&self, config: &IndexConfig) -> Result<Arc<VectorIndex>, LoadError> {
        let index = match config.dimension {
            Some(0) => {
                return Err(LoadError::Config("index dimension must be positive".to_string()));
            }
            Some(dimension) => VectorIndex::with_dimension(dimension, config.metric),
            None => VectorIndex::new(config.metric),
        };
        Ok(Arc::new(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::DistanceMetric;

    #[tokio::test]
    async fn test_instantiate_with_dimension() {
        let config = IndexConfig {
            metric: DistanceMetric::Cosine,
            dimension: Some(3),
        };
        let index = InMemoryEngineLoader.instantiate(&config).await.unwrap();
        assert_eq!(index.dimension(), Some(3));
        assert_eq!(index.metric(), DistanceMetric::Cosine);
        assert_eq!(index.generation(), 0);
    }

    #[tokio::test]
    async fn test_zero_dimension_rejected() {
        let config = IndexConfig {
            dimension: Some(0),
            ..IndexConfig::default()
        };
        assert!(InMemoryEngineLoader.instantiate(&config).await.is_err());
    }
}
