//! Vector index capability: the entry model, similarity metrics, and the
//! trait concrete stores implement.
//!
//! Callers depend on [`VectorIndex`] only; [`FlatIndex`] is the exact
//! brute-force implementation and the correctness oracle for any future
//! approximate backend.

pub mod flat;
pub mod snapshot;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::embedder::EmbeddingVector;
use crate::segmenter::Chunk;
use crate::types::VellumError;

pub use flat::FlatIndex;
pub use snapshot::IndexSnapshot;

/// A chunk paired with its embedding, owned by the index once inserted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: EmbeddingVector,
}

impl IndexEntry {
    #[must_use]
    pub fn new(chunk: Chunk, vector: EmbeddingVector) -> Self {
        Self { chunk, vector }
    }
}

/// Similarity metric, fixed when an index is created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Cosine,
    InnerProduct,
}

impl Metric {
    /// Similarity between two equal-length vectors; higher is closer.
    ///
    /// Cosine scores zero-norm vectors as `0.0` so ordering stays total.
    #[must_use]
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        match self {
            Metric::InnerProduct => dot,
            Metric::Cosine => {
                let norm_a = a.iter().map(|v| v * v).sum::<f32>().sqrt();
                let norm_b = b.iter().map(|v| v * v).sum::<f32>().sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    0.0
                } else {
                    dot / (norm_a * norm_b)
                }
            }
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Cosine => write!(f, "cosine"),
            Metric::InnerProduct => write!(f, "inner_product"),
        }
    }
}

/// An entry with its similarity score for one query.
pub type SearchHit = (IndexEntry, f32);

/// Nearest-neighbor storage capability.
///
/// Implementations must make `insert` atomic per call (readers observe the
/// whole batch or none of it) and serialize concurrent inserts.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Inserts a batch of entries.
    ///
    /// # Errors
    ///
    /// [`VellumError::DimensionMismatch`] if any vector disagrees with the
    /// index's established dimension; nothing from the batch is inserted.
    async fn insert(&self, entries: Vec<IndexEntry>) -> Result<(), VellumError>;

    /// Top-`k` entries ranked by descending similarity to `vector`.
    ///
    /// Equal scores rank by ascending chunk id, so repeated queries against
    /// an unchanged index reproduce byte-for-byte. A `k` beyond the entry
    /// count returns everything ranked.
    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>, VellumError>;

    /// Number of stored entries.
    async fn count(&self) -> Result<usize, VellumError>;
}
