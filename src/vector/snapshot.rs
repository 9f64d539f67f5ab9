//! Immutable index generations
//!
//! A snapshot is one complete document set. Builds never mutate a snapshot;
//! they publish a new one, so a reader holding an `Arc<IndexSnapshot>` always
//! sees exactly one build's documents.

use crate::vector::index::{VectorError, VectorResult};
use crate::vector::metric::DistanceMetric;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Above this many documents, scoring is spread across the rayon pool.
/// Collection preserves document order, so rankings are identical to the
/// sequential scan.
pub const PARALLEL_SCAN_THRESHOLD: usize = 4096;

/// A stored document with its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub url: String,
    pub embedding: Vec<f32>,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            embedding,
        }
    }
}

/// A search hit: the stored document and its distance to the query
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub document: Arc<Document>,
    /// Distance under the index metric (smaller is closer)
    pub distance: f32,
    /// Monotone transform of `distance` where larger is closer
    pub similarity: f32,
}

/// One generation of the index
#[derive(Debug)]
pub struct IndexSnapshot {
    generation: u64,
    dimension: Option<usize>,
    metric: DistanceMetric,
    documents: Vec<Arc<Document>>,
}

impl IndexSnapshot {
    pub(crate) fn new(
        generation: u64,
        dimension: Option<usize>,
        metric: DistanceMetric,
        documents: Vec<Arc<Document>>,
    ) -> Self {
        Self {
            generation,
            dimension,
            metric,
            documents,
        }
    }

    /// Build counter; 0 means the index has never been built
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Established embedding dimension, if any
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Documents in insertion order
    pub fn documents(&self) -> &[Arc<Document>] {
        &self.documents
    }

    /// Look up a document by id
    pub fn get(&self, id: &str) -> Option<&Arc<Document>> {
        self.documents.iter().find(|doc| doc.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Exact k-nearest-neighbor search over this generation.
    ///
    /// Results are ordered by non-decreasing distance; equal distances keep
    /// insertion order. `k` larger than the document count is clamped.
    pub fn search(&self, query: &[f32], k: usize) -> VectorResult<Vec<Neighbor>> {
        if let Some(expected) = self.dimension {
            if query.len() != expected {
                return Err(VectorError::DimensionMismatch {
                    expected,
                    got: query.len(),
                });
            }
        }
        if query.iter().any(|v| !v.is_finite()) {
            return Err(VectorError::NonFiniteQuery);
        }

        if k == 0 || self.documents.is_empty() {
            return Ok(Vec::new());
        }

        let metric = self.metric;
        let score = |doc: &Arc<Document>| metric.distance(query, &doc.embedding);
        let distances: Vec<f32> = if self.documents.len() >= PARALLEL_SCAN_THRESHOLD {
            self.documents.par_iter().map(score).collect()
        } else {
            self.documents.iter().map(score).collect()
        };

        let mut ranked: Vec<(usize, f32)> = distances.into_iter().enumerate().collect();
        // sort_by is stable: ties stay in insertion order
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        ranked.truncate(k);

        Ok(ranked
            .into_iter()
            .map(|(position, distance)| Neighbor {
                document: Arc::clone(&self.documents[position]),
                distance,
                similarity: metric.similarity(distance),
            })
            .collect())
    }
}
