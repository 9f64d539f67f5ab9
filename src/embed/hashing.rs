//! Local feature-hashing embedder
//!
//! Signed feature hashing over lower-cased word tokens and their character
//! trigrams, L2-normalized. Needs no model files or network, and puts texts
//! that share words close together.
//!
//! Embeddings are reproducible across runs on the same target. `FxHasher`
//! mixes in `usize` words, so 32-bit and 64-bit builds produce different
//! vectors; an index must be built and queried by the same build.

use crate::embed::{EmbedResult, EmbeddingProvider, LoadError, ProviderLoader};
use async_trait::async_trait;
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

const TOKEN_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

/// Deterministic bag-of-features embedder
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Embed synchronously. Text with no word characters maps to the zero vector.
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return vector;
        }

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
        {
            self.add_feature(&mut vector, 0, &token, TOKEN_WEIGHT);

            let padded: Vec<char> = format!("^{}$", token).chars().collect();
            for gram in padded.windows(3) {
                let gram: String = gram.iter().collect();
                self.add_feature(&mut vector, 1, &gram, TRIGRAM_WEIGHT);
            }
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }

    fn add_feature(&self, vector: &mut [f32], kind: u8, feature: &str, weight: f32) {
        let mut hasher = FxHasher::default();
        kind.hash(&mut hasher);
        feature.hash(&mut hasher);
        let hash = hasher.finish();

        let bucket = (hash % self.dimensions as u64) as usize;
        let sign = if hash >> 63 == 1 { -1.0 } else { 1.0 };
        vector[bucket] += sign * weight;
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> EmbedResult<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "feature-hash"
    }
}

/// Loader for [`HashingEmbedder`]
#[derive(Debug, Clone)]
pub struct HashingLoader {
    dimensions: usize,
}

impl HashingLoader {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl ProviderLoader for HashingLoader {
    async fn load(&self) -> Result<Arc<dyn EmbeddingProvider>, LoadError> {
        if self.dimensions == 0 {
            return Err(LoadError::Config("hashing embedder needs a positive dimension".to_string()));
        }
        Ok(Arc::new(HashingEmbedder::new(self.dimensions)))
    }
}
