//! Exact brute-force vector index.
//!
//! Every query scans every entry, which makes this the ground-truth
//! implementation approximate backends are measured against. Inserts take
//! the write lock for the whole validate-and-extend, so concurrent inserts
//! serialize and readers never observe a partially applied batch.

use async_trait::async_trait;
use parking_lot::RwLock;

use super::snapshot::IndexSnapshot;
use super::{IndexEntry, Metric, SearchHit, VectorIndex};
use crate::types::VellumError;

/// In-memory flat index over `(chunk, vector)` entries.
#[derive(Debug)]
pub struct FlatIndex {
    metric: Metric,
    state: RwLock<State>,
}

#[derive(Debug, Default)]
struct State {
    /// Established with the first inserted batch; fixed afterwards.
    dimension: Option<usize>,
    entries: Vec<IndexEntry>,
}

impl FlatIndex {
    #[must_use]
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            state: RwLock::new(State::default()),
        }
    }

    #[must_use]
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// The established vector dimension, once anything has been inserted.
    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.state.read().dimension
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Synchronous core of [`VectorIndex::insert`].
    ///
    /// The whole batch is validated against the established dimension (the
    /// first batch establishes it) before anything is appended, so a
    /// rejected batch leaves the index untouched.
    pub fn insert_batch(&self, entries: Vec<IndexEntry>) -> Result<(), VellumError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut state = self.state.write();
        let expected = state.dimension.unwrap_or(entries[0].vector.len());
        if expected == 0 {
            return Err(VellumError::InvalidConfig {
                reason: "embedding vectors must not be empty".into(),
            });
        }
        for entry in &entries {
            if entry.vector.len() != expected {
                return Err(VellumError::DimensionMismatch {
                    expected,
                    actual: entry.vector.len(),
                });
            }
        }

        state.dimension = Some(expected);
        state.entries.extend(entries);
        tracing::debug!(
            entries = state.entries.len(),
            dimension = expected,
            metric = %self.metric,
            "index batch inserted"
        );
        Ok(())
    }

    /// Synchronous core of [`VectorIndex::search`]: full scan, stable
    /// ranking.
    pub fn search_exact(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>, VellumError> {
        if k == 0 {
            return Err(VellumError::InvalidConfig {
                reason: "k must be greater than zero".into(),
            });
        }

        let state = self.state.read();
        if state.entries.is_empty() {
            return Err(VellumError::EmptyIndex);
        }
        let expected = state.dimension.unwrap_or_default();
        if vector.len() != expected {
            return Err(VellumError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = state
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, self.metric.score(&entry.vector, vector)))
            .collect();
        // Stable sort: equal (score, chunk id) pairs keep insertion order.
        scored.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| state.entries[a.0].chunk.id.cmp(&state.entries[b.0].chunk.id))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, score)| (state.entries[position].clone(), score))
            .collect())
    }

    /// Serializable image of this index: entries, metric, and dimension.
    #[must_use]
    pub fn snapshot(&self) -> IndexSnapshot {
        let state = self.state.read();
        IndexSnapshot {
            metric: self.metric,
            dimension: state.dimension,
            entries: state.entries.clone(),
        }
    }

    /// Rebuilds an index from a snapshot, revalidating every entry against
    /// the recorded dimension.
    pub fn from_snapshot(snapshot: IndexSnapshot) -> Result<Self, VellumError> {
        let index = Self::new(snapshot.metric);
        index.state.write().dimension = snapshot.dimension;
        index.insert_batch(snapshot.entries)?;
        Ok(index)
    }
}

#[async_trait]
impl VectorIndex for FlatIndex {
    async fn insert(&self, entries: Vec<IndexEntry>) -> Result<(), VellumError> {
        self.insert_batch(entries)
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>, VellumError> {
        self.search_exact(vector, k)
    }

    async fn count(&self) -> Result<usize, VellumError> {
        Ok(self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::Chunk;

    fn entry(id: usize, vector: Vec<f32>) -> IndexEntry {
        IndexEntry::new(
            Chunk {
                id,
                source_page: 0,
                text: format!("chunk {id}"),
                start_offset: 0,
                end_offset: 8,
            },
            vector,
        )
    }

    #[test]
    fn first_batch_establishes_the_dimension() {
        let index = FlatIndex::new(Metric::Cosine);
        assert_eq!(index.dimension(), None);

        index
            .insert_batch(vec![entry(0, vec![1.0, 0.0, 0.0])])
            .unwrap();
        assert_eq!(index.dimension(), Some(3));

        let err = index
            .insert_batch(vec![entry(1, vec![1.0, 0.0])])
            .unwrap_err();
        assert!(matches!(
            err,
            VellumError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn rejected_batches_leave_the_index_untouched() {
        let index = FlatIndex::new(Metric::Cosine);
        index
            .insert_batch(vec![entry(0, vec![1.0, 0.0]), entry(1, vec![0.0, 1.0])])
            .unwrap();

        let before = index.len();
        let err = index
            .insert_batch(vec![
                entry(2, vec![0.5, 0.5]),
                entry(3, vec![0.1, 0.2, 0.3]),
            ])
            .unwrap_err();
        assert!(matches!(err, VellumError::DimensionMismatch { .. }));
        assert_eq!(index.len(), before, "failed insert mutated the index");
    }

    #[test]
    fn stored_vector_queries_itself_to_the_top() {
        for metric in [Metric::Cosine, Metric::InnerProduct] {
            let index = FlatIndex::new(metric);
            index
                .insert_batch(vec![
                    entry(0, vec![0.9, 0.1, 0.0]),
                    entry(1, vec![0.0, 1.0, 0.0]),
                    entry(2, vec![0.2, 0.3, 0.9]),
                ])
                .unwrap();

            let hits = index.search_exact(&[0.0, 1.0, 0.0], 3).unwrap();
            assert_eq!(hits[0].0.chunk.id, 1, "metric {metric}");
            assert!(hits.iter().skip(1).all(|hit| hit.1 <= hits[0].1));
        }
    }

    #[test]
    fn oversized_k_returns_everything_ranked() {
        let index = FlatIndex::new(Metric::Cosine);
        index
            .insert_batch(vec![
                entry(0, vec![1.0, 0.0, 0.0, 0.0]),
                entry(1, vec![0.0, 1.0, 0.0, 0.0]),
                entry(2, vec![0.0, 0.0, 1.0, 0.0]),
            ])
            .unwrap();

        let hits = index.search_exact(&[1.0, 0.0, 0.0, 0.0], 5).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].0.chunk.id, 0);
    }

    #[test]
    fn equal_scores_rank_by_chunk_id() {
        let index = FlatIndex::new(Metric::Cosine);
        // Insert out of id order; both entries score identically.
        index
            .insert_batch(vec![entry(5, vec![1.0, 0.0]), entry(2, vec![2.0, 0.0])])
            .unwrap();

        let hits = index.search_exact(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].0.chunk.id, 2);
        assert_eq!(hits[1].0.chunk.id, 5);

        let again = index.search_exact(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits, again, "repeated query must reproduce exactly");
    }

    #[test]
    fn empty_index_and_bad_queries_are_typed_errors() {
        let index = FlatIndex::new(Metric::Cosine);
        assert!(matches!(
            index.search_exact(&[1.0], 1).unwrap_err(),
            VellumError::EmptyIndex
        ));

        index.insert_batch(vec![entry(0, vec![1.0, 0.0])]).unwrap();
        assert!(matches!(
            index.search_exact(&[1.0], 0).unwrap_err(),
            VellumError::InvalidConfig { .. }
        ));
        assert!(matches!(
            index.search_exact(&[1.0, 0.0, 0.0], 1).unwrap_err(),
            VellumError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn empty_batch_insert_is_a_no_op() {
        let index = FlatIndex::new(Metric::Cosine);
        index.insert_batch(Vec::new()).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.dimension(), None);
    }

    #[tokio::test]
    async fn capability_trait_delegates_to_the_sync_core() {
        let index = FlatIndex::new(Metric::Cosine);
        let store: &dyn VectorIndex = &index;

        store
            .insert(vec![entry(0, vec![0.0, 1.0])])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        let hits = store.search(&[0.0, 1.0], 1).await.unwrap();
        assert_eq!(hits[0].0.chunk.id, 0);
    }
}
