//! Exact in-memory vector index
//!
//! The index holds one `IndexSnapshot` at a time behind a lock that is only
//! taken long enough to clone or swap an `Arc`. `build` validates the whole
//! batch first and then publishes it in a single swap.
//!
//! Builds, clears and successful searches are announced as [`IndexEvent`]s
//! on a broadcast channel; see [`VectorIndex::subscribe`].

use crate::vector::metric::DistanceMetric;
use crate::vector::snapshot::{Document, IndexSnapshot, Neighbor};
use rustc_hash::FxHashSet;
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Vector index errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VectorError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Duplicate document id: {0}")]
    DuplicateId(String),

    #[error("Document {id} has an empty embedding")]
    EmptyEmbedding { id: String },

    #[error("Document {id} has a non-finite embedding component")]
    NonFiniteComponent { id: String },

    #[error("Query vector has a non-finite component")]
    NonFiniteQuery,
}

pub type VectorResult<T> = Result<T, VectorError>;

/// Buffered events per subscriber before it starts lagging
const EVENT_CAPACITY: usize = 64;

/// Notification of a change to, or a read of, the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexEvent {
    /// A build published `generation` holding `documents` documents
    Built { generation: u64, documents: usize },
    /// The index was emptied, publishing `generation`
    Cleared { generation: u64 },
    /// A search over `generation` returned `hits` neighbors
    Searched { generation: u64, hits: usize },
}

/// Exact nearest-neighbor index with atomic rebuilds
pub struct VectorIndex {
    /// Distance metric, fixed for the lifetime of the index
    metric: DistanceMetric,
    /// Current generation
    current: RwLock<Arc<IndexSnapshot>>,
    events: broadcast::Sender<IndexEvent>,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("VectorIndex")
            .field("metric", &self.metric)
            .field("dimension", &snapshot.dimension())
            .field("generation", &snapshot.generation())
            .field("documents", &snapshot.len())
            .finish()
    }
}

impl VectorIndex {
    /// Create an empty index; the dimension is fixed by the first non-empty build
    pub fn new(metric: DistanceMetric) -> Self {
        Self::with_snapshot(metric, IndexSnapshot::new(0, None, metric, Vec::new()))
    }

    /// Create an empty index with the dimension established up front
    pub fn with_dimension(dimension: usize, metric: DistanceMetric) -> Self {
        Self::with_snapshot(
            metric,
            IndexSnapshot::new(0, Some(dimension), metric, Vec::new()),
        )
    }

    fn with_snapshot(metric: DistanceMetric, snapshot: IndexSnapshot) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            metric,
            current: RwLock::new(Arc::new(snapshot)),
            events,
        }
    }

    /// Receive [`IndexEvent`]s published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<IndexEvent> {
        self.events.subscribe()
    }

    /// Replace the whole document set.
    ///
    /// Every embedding must have the established dimension, or, when none is
    /// established yet, the dimension of the first document. On error nothing
    /// changes. Returns the new generation.
    pub fn build(&self, documents: Vec<Document>) -> VectorResult<u64> {
        let established = self.snapshot().dimension();
        let batch_dimension = validate_batch(&documents, established)?;
        let documents: Vec<Arc<Document>> = documents.into_iter().map(Arc::new).collect();
        let count = documents.len();

        let mut slot = self.write_slot();
        // Another build may have fixed the dimension since validation
        let dimension = match (slot.dimension(), batch_dimension) {
            (Some(expected), Some(got)) if expected != got => {
                return Err(VectorError::DimensionMismatch { expected, got });
            }
            (Some(expected), _) => Some(expected),
            (None, got) => got,
        };
        let generation = slot.generation() + 1;
        *slot = Arc::new(IndexSnapshot::new(generation, dimension, self.metric, documents));
        // Sent under the lock so events arrive in generation order
        self.notify(IndexEvent::Built { generation, documents: count });
        drop(slot);

        info!(generation, documents = count, dimension = ?dimension, "index built");
        Ok(generation)
    }

    /// Drop every document. The established dimension is kept.
    pub fn clear(&self) -> u64 {
        let mut slot = self.write_slot();
        let generation = slot.generation() + 1;
        let dimension = slot.dimension();
        *slot = Arc::new(IndexSnapshot::new(generation, dimension, self.metric, Vec::new()));
        self.notify(IndexEvent::Cleared { generation });
        debug!(generation, "index cleared");
        generation
    }

    /// Search the current generation for the `k` nearest neighbors
    pub fn search(&self, query: &[f32], k: usize) -> VectorResult<Vec<Neighbor>> {
        let snapshot = self.snapshot();
        self.search_in(&snapshot, query, k)
    }

    /// Search a snapshot previously taken from this index
    pub fn search_in(
        &self,
        snapshot: &IndexSnapshot,
        query: &[f32],
        k: usize,
    ) -> VectorResult<Vec<Neighbor>> {
        let neighbors = snapshot.search(query, k)?;
        self.notify(IndexEvent::Searched {
            generation: snapshot.generation(),
            hits: neighbors.len(),
        });
        Ok(neighbors)
    }

    /// The current generation. Holding the returned `Arc` pins that
    /// generation even if a newer build is published.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        // A panic while holding the lock cannot leave a torn snapshot behind
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    pub fn generation(&self) -> u64 {
        self.snapshot().generation()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.snapshot().dimension()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.snapshot().contains(id)
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    fn notify(&self, event: IndexEvent) {
        // Nobody listening is not an error
        let _ = self.events.send(event);
    }

    fn write_slot(&self) -> RwLockWriteGuard<'_, Arc<IndexSnapshot>> {
        self.current.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Check a batch for consistent, finite embeddings and unique ids.
/// Returns the batch dimension (`None` for an empty batch with nothing established).
fn validate_batch(documents: &[Document], established: Option<usize>) -> VectorResult<Option<usize>> {
    let mut expected = established;
    let mut seen: FxHashSet<&str> = FxHashSet::default();

    for doc in documents {
        let got = doc.embedding.len();
        match expected {
            Some(expected) if expected != got => {
                return Err(VectorError::DimensionMismatch { expected, got });
            }
            Some(_) => {}
            // Only an empty first vector can leave D unestablished
            None if got == 0 => {
                return Err(VectorError::EmptyEmbedding { id: doc.id.clone() });
            }
            None => expected = Some(got),
        }
        if doc.embedding.iter().any(|v| !v.is_finite()) {
            return Err(VectorError::NonFiniteComponent { id: doc.id.clone() });
        }
        if !seen.insert(doc.id.as_str()) {
            return Err(VectorError::DuplicateId(doc.id.clone()));
        }
    }

    Ok(expected)
}
