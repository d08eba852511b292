//! Embedding orchestration: the provider seam, a deterministic mock, and
//! the order-preserving batching adapter.
//!
//! The adapter is the only fan-out point in the pipeline: batches are
//! dispatched with bounded concurrency and reassembled in batch order, so
//! the output sequence always matches chunk id order no matter which batch
//! finishes first.

pub mod http;

use std::hash::Hasher;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use rustc_hash::FxHasher;
use thiserror::Error;

use crate::segmenter::Chunk;
use crate::types::VellumError;

pub use http::HttpEmbeddingProvider;

/// Fixed-length numeric representation of a chunk's meaning.
pub type EmbeddingVector = Vec<f32>;

pub(crate) const DEFAULT_BATCH_SIZE: usize = 64;
pub(crate) const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Failure inside a single provider call.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider response malformed: {0}")]
    Malformed(String),

    /// The provider broke its length contract.
    #[error("provider returned {actual} vectors for {expected} inputs")]
    LengthMismatch { expected: usize, actual: usize },
}

/// External embedding capability: text in, fixed-length vectors out.
///
/// Implementations own transport, auth, and rate-limiting concerns. The
/// output must be the same length and order as the input; the provider is
/// assumed deterministic (same text, same vector) but this is not verified
/// here.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Stable label used in diagnostics and progress events.
    fn id(&self) -> &str;

    /// Embeds one batch of texts.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, ProviderError>;
}

/// Deterministic provider for tests and offline runs.
///
/// Identical text always maps to the identical unit vector; distinct texts
/// map to distinct vectors with overwhelming probability.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl MockEmbeddingProvider {
    const DEFAULT_DIMENSION: usize = 16;

    #[must_use]
    pub fn new() -> Self {
        Self {
            dimension: Self::DEFAULT_DIMENSION,
        }
    }

    #[must_use]
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn vector_for(&self, text: &str) -> EmbeddingVector {
        let mut hasher = FxHasher::default();
        hasher.write(text.as_bytes());
        // Keep the xorshift state non-zero even for degenerate hashes.
        let mut state = hasher.finish() | 1;

        let mut vector = Vec::with_capacity(self.dimension);
        for _ in 0..self.dimension {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let unit = (state >> 11) as f64 / (1u64 << 53) as f64;
            vector.push((unit * 2.0 - 1.0) as f32);
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn id(&self) -> &str {
        "mock"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, ProviderError> {
        Ok(texts.iter().map(|text| self.vector_for(text)).collect())
    }
}

/// Order-preserving batched front of an [`EmbeddingProvider`].
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    max_concurrency: usize,
}

impl Embedder {
    #[must_use]
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Overrides batch size and the concurrent-batch ceiling.
    #[must_use]
    pub fn with_batching(mut self, batch_size: usize, max_concurrency: usize) -> Self {
        self.batch_size = batch_size;
        self.max_concurrency = max_concurrency;
        self
    }

    #[must_use]
    pub fn provider_id(&self) -> &str {
        self.provider.id()
    }

    /// Embeds every chunk, aligned index-for-index with the input.
    ///
    /// Up to `max_concurrency` batches are in flight at once; results are
    /// reassembled in batch order, not arrival order. The first failed
    /// batch fails the whole call with the chunk-id range of that batch;
    /// no partial vectors are returned, and sibling in-flight batches are
    /// dropped with the stream.
    pub async fn embed(&self, chunks: &[Chunk]) -> Result<Vec<EmbeddingVector>, VellumError> {
        if self.batch_size == 0 || self.max_concurrency == 0 {
            return Err(VellumError::InvalidConfig {
                reason: "batch_size and max_concurrency must be greater than zero".into(),
            });
        }
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let batched: Vec<Vec<EmbeddingVector>> =
            stream::iter(chunks.chunks(self.batch_size).map(|batch| {
                let provider = Arc::clone(&self.provider);
                async move {
                    let first_chunk = batch[0].id;
                    let last_chunk = batch[batch.len() - 1].id;
                    let texts: Vec<String> =
                        batch.iter().map(|chunk| chunk.text.clone()).collect();

                    let vectors = provider.embed_batch(&texts).await.map_err(|err| {
                        VellumError::EmbeddingProvider {
                            first_chunk,
                            last_chunk,
                            message: err.to_string(),
                        }
                    })?;
                    if vectors.len() != texts.len() {
                        return Err(VellumError::EmbeddingProvider {
                            first_chunk,
                            last_chunk,
                            message: ProviderError::LengthMismatch {
                                expected: texts.len(),
                                actual: vectors.len(),
                            }
                            .to_string(),
                        });
                    }
                    Ok(vectors)
                }
            }))
            .buffered(self.max_concurrency)
            .try_collect()
            .await?;

        Ok(batched.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(count: usize) -> Vec<Chunk> {
        (0..count)
            .map(|id| Chunk {
                id,
                source_page: 0,
                text: format!("chunk text {id}"),
                start_offset: id * 10,
                end_offset: id * 10 + 10,
            })
            .collect()
    }

    #[tokio::test]
    async fn mock_provider_is_deterministic() {
        let provider = MockEmbeddingProvider::new();
        let inputs = vec![
            "Hello world".to_string(),
            "Goodbye world".to_string(),
            "Hello world".to_string(),
        ];

        let first = provider.embed_batch(&inputs).await.unwrap();
        let second = provider.embed_batch(&inputs).await.unwrap();

        assert_eq!(first, second, "mock embeddings should be deterministic");
        assert_eq!(first[0], first[2], "identical text, identical vector");
        assert_ne!(first[0], first[1], "distinct text, distinct vector");
        assert!(first.iter().all(|v| v.len() == provider.dimension()));
    }

    #[tokio::test]
    async fn mock_vectors_are_unit_length() {
        let provider = MockEmbeddingProvider::with_dimension(8);
        let vectors = provider
            .embed_batch(&["some text".to_string()])
            .await
            .unwrap();
        let norm: f32 = vectors[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5, "norm was {norm}");
    }

    #[tokio::test]
    async fn output_is_aligned_regardless_of_batch_boundaries() {
        let provider = Arc::new(MockEmbeddingProvider::new());
        let input = chunks(17);

        let whole = Embedder::new(Arc::clone(&provider) as Arc<dyn EmbeddingProvider>)
            .with_batching(100, 1)
            .embed(&input)
            .await
            .unwrap();

        for (batch_size, concurrency) in [(1, 8), (3, 2), (5, 5), (17, 1)] {
            let vectors = Embedder::new(Arc::clone(&provider) as Arc<dyn EmbeddingProvider>)
                .with_batching(batch_size, concurrency)
                .embed(&input)
                .await
                .unwrap();
            assert_eq!(vectors.len(), input.len());
            assert_eq!(
                vectors, whole,
                "batch_size {batch_size} / concurrency {concurrency} changed the sequence"
            );
        }
    }

    #[tokio::test]
    async fn empty_input_embeds_to_empty_output() {
        let embedder = Embedder::new(Arc::new(MockEmbeddingProvider::new()));
        assert!(embedder.embed(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_batching_knobs_are_rejected() {
        let embedder =
            Embedder::new(Arc::new(MockEmbeddingProvider::new())).with_batching(0, 4);
        let err = embedder.embed(&chunks(3)).await.unwrap_err();
        assert!(matches!(err, VellumError::InvalidConfig { .. }));
    }

    /// Fails any batch containing the poisoned chunk text.
    struct PoisonedProvider {
        poison: String,
    }

    #[async_trait]
    impl EmbeddingProvider for PoisonedProvider {
        fn id(&self) -> &str {
            "poisoned"
        }

        async fn embed_batch(
            &self,
            texts: &[String],
        ) -> Result<Vec<EmbeddingVector>, ProviderError> {
            if texts.iter().any(|text| *text == self.poison) {
                return Err(ProviderError::Transport("simulated outage".into()));
            }
            Ok(texts.iter().map(|_| vec![0.0, 1.0]).collect())
        }
    }

    #[tokio::test]
    async fn failed_batch_reports_its_chunk_range() {
        let input = chunks(10);
        let embedder = Embedder::new(Arc::new(PoisonedProvider {
            poison: input[7].text.clone(),
        }))
        .with_batching(3, 2);

        let err = embedder.embed(&input).await.unwrap_err();
        match err {
            VellumError::EmbeddingProvider {
                first_chunk,
                last_chunk,
                ..
            } => {
                // Chunk 7 lives in the batch spanning ids 6..=8.
                assert_eq!((first_chunk, last_chunk), (6, 8));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    /// Returns one vector fewer than requested.
    struct ShortProvider;

    #[async_trait]
    impl EmbeddingProvider for ShortProvider {
        fn id(&self) -> &str {
            "short"
        }

        async fn embed_batch(
            &self,
            texts: &[String],
        ) -> Result<Vec<EmbeddingVector>, ProviderError> {
            Ok(texts.iter().skip(1).map(|_| vec![1.0]).collect())
        }
    }

    #[tokio::test]
    async fn length_contract_violations_fail_the_batch() {
        let embedder = Embedder::new(Arc::new(ShortProvider)).with_batching(4, 1);
        let err = embedder.embed(&chunks(4)).await.unwrap_err();
        match err {
            VellumError::EmbeddingProvider { message, .. } => {
                assert!(message.contains("3 vectors for 4 inputs"), "got: {message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
