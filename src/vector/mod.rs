//! Vector index engine
//!
//! This module provides an exact in-memory nearest-neighbor index over
//! document embeddings, rebuilt atomically as a whole.

pub mod index;
pub mod metric;
pub mod snapshot;

pub use index::{IndexEvent, VectorError, VectorIndex, VectorResult};
pub use metric::DistanceMetric;
pub use snapshot::{Document, IndexSnapshot, Neighbor, PARALLEL_SCAN_THRESHOLD};
