//! Distance metrics for exact nearest-neighbor scoring
//!
//! Every metric is expressed as a distance: smaller is closer. Each
//! `VectorIndex` picks one metric at construction and keeps it.

use serde::{Deserialize, Serialize};

/// Distance metric for vector search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Squared L2 (Euclidean) distance
    #[default]
    L2,
    /// Cosine distance (1 - cosine similarity)
    Cosine,
    /// Inner product distance (1 - dot product, for normalized vectors)
    InnerProduct,
}

impl DistanceMetric {
    /// Distance between two vectors of equal length
    pub fn distance(&self, va: &[f32], vb: &[f32]) -> f32 {
        match self {
            DistanceMetric::L2 => squared_l2(va, vb),
            DistanceMetric::Cosine => cosine_distance(va, vb),
            DistanceMetric::InnerProduct => (1.0 - dot(va, vb)) as f32,
        }
    }

    /// Map a distance produced by this metric onto a similarity score
    /// where larger means closer.
    pub fn similarity(&self, distance: f32) -> f32 {
        match self {
            DistanceMetric::L2 => 1.0 / (1.0 + distance),
            DistanceMetric::Cosine | DistanceMetric::InnerProduct => 1.0 - distance,
        }
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DistanceMetric::L2 => "l2",
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::InnerProduct => "inner_product",
        };
        f.write_str(name)
    }
}

// Accumulated in f64: finite f32 components cannot overflow it, so finite
// inputs never produce NaN. Results may still round to f32::INFINITY.

fn squared_l2(va: &[f32], vb: &[f32]) -> f32 {
    va.iter()
        .zip(vb.iter())
        .map(|(&a, &b)| {
            let d = f64::from(a) - f64::from(b);
            d * d
        })
        .sum::<f64>() as f32
}

fn dot(va: &[f32], vb: &[f32]) -> f64 {
    va.iter()
        .zip(vb.iter())
        .map(|(&a, &b)| f64::from(a) * f64::from(b))
        .sum()
}

fn cosine_distance(va: &[f32], vb: &[f32]) -> f32 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (&a, &b) in va.iter().zip(vb.iter()) {
        let (a, b) = (f64::from(a), f64::from(b));
        dot += a * b;
        norm_a += a * a;
        norm_b += b * b;
    }

    if norm_a <= 0.0 || norm_b <= 0.0 {
        return 1.0;
    }

    let sim = (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0);
    (1.0 - sim) as f32
}
