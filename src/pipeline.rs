//! Ingestion orchestration: Segmenting → Embedding → Indexing.
//!
//! The orchestrator invokes each stage in order and surfaces the first
//! failure annotated with the stage that was active. It never retries a
//! failed embedding batch (retry policy belongs to the caller) and never
//! mutates the index partially; the index's atomic insert guarantees the
//! boundary. A failed run is terminal; retrying means a fresh run.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::document::Document;
use crate::embedder::{
    DEFAULT_BATCH_SIZE, DEFAULT_MAX_CONCURRENCY, Embedder, EmbeddingProvider,
};
use crate::events::{ProgressEvent, ProgressSender};
use crate::index::{FlatIndex, IndexEntry, Metric, VectorIndex};
use crate::segmenter::{self, SegmenterConfig};
use crate::types::VellumError;

/// Stages of one ingestion run, in execution order.
///
/// A run moves `Idle → Segmenting → Embedding → Indexing → Ready`; any
/// in-progress stage can transition to failure, captured as
/// [`IngestError`]. No stage is ever re-entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Segmenting,
    Embedding,
    Indexing,
    Ready,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Idle => write!(f, "idle"),
            PipelineStage::Segmenting => write!(f, "segmenting"),
            PipelineStage::Embedding => write!(f, "embedding"),
            PipelineStage::Indexing => write!(f, "indexing"),
            PipelineStage::Ready => write!(f, "ready"),
        }
    }
}

/// An ingestion failure annotated with the stage that was active.
///
/// The underlying [`VellumError`] is carried unconverted; this wrapper
/// only adds attribution.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct IngestError {
    pub stage: PipelineStage,
    #[source]
    pub source: VellumError,
}

/// Knobs for one ingestion run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub segmenter: SegmenterConfig,
    /// Chunks embedded per provider call.
    pub batch_size: usize,
    /// Upper bound on concurrently in-flight embedding batches.
    pub max_concurrency: usize,
    /// Similarity metric for indexes created by [`IngestionPipeline::ingest`].
    pub metric: Metric,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            segmenter: SegmenterConfig::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            metric: Metric::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), VellumError> {
        self.segmenter.validate()?;
        if self.batch_size == 0 || self.max_concurrency == 0 {
            return Err(VellumError::InvalidConfig {
                reason: "batch_size and max_concurrency must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

/// Summary of a completed ingestion run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestReport {
    pub run_id: Uuid,
    pub pages: usize,
    pub chunks: usize,
    /// Vector dimension observed for this run.
    pub dimension: usize,
    pub duration: Duration,
}

/// Wires Segmenter → Embedder → Vector Index for one document at a time.
pub struct IngestionPipeline {
    embedder: Embedder,
    config: PipelineConfig,
    progress: Option<ProgressSender>,
}

impl std::fmt::Debug for IngestionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionPipeline")
            .field("config", &self.config)
            .field("progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

impl IngestionPipeline {
    #[must_use]
    pub fn builder() -> IngestionPipelineBuilder {
        IngestionPipelineBuilder::default()
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Ingests into a fresh [`FlatIndex`] created with the configured
    /// metric.
    pub async fn ingest(&self, document: &Document) -> Result<FlatIndex, IngestError> {
        let index = FlatIndex::new(self.config.metric);
        self.ingest_into(document, &index).await?;
        Ok(index)
    }

    /// Ingests into an explicitly shared index.
    ///
    /// The index is the only structure mutated after pipeline start, and
    /// only by one atomic insert at the end, so a failed run leaves it
    /// exactly as it was.
    pub async fn ingest_into<I>(
        &self,
        document: &Document,
        index: &I,
    ) -> Result<IngestReport, IngestError>
    where
        I: VectorIndex + ?Sized,
    {
        let run_id = Uuid::new_v4();
        let started = Instant::now();

        self.emit(
            run_id,
            PipelineStage::Segmenting,
            format!(
                "segmenting {} pages from {}",
                document.page_count(),
                document.origin()
            ),
        );
        let chunks = segmenter::split(document, &self.config.segmenter)
            .map_err(|err| self.fail(run_id, PipelineStage::Segmenting, err))?;

        self.emit(
            run_id,
            PipelineStage::Embedding,
            format!(
                "embedding {} chunks via {}",
                chunks.len(),
                self.embedder.provider_id()
            ),
        );
        let vectors = self
            .embedder
            .embed(&chunks)
            .await
            .map_err(|err| self.fail(run_id, PipelineStage::Embedding, err))?;
        let dimension = vectors.first().map(Vec::len).unwrap_or(0);

        self.emit(
            run_id,
            PipelineStage::Indexing,
            format!("inserting {} entries", vectors.len()),
        );
        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry::new(chunk, vector))
            .collect();
        let chunk_count = entries.len();
        index
            .insert(entries)
            .await
            .map_err(|err| self.fail(run_id, PipelineStage::Indexing, err))?;

        let report = IngestReport {
            run_id,
            pages: document.page_count(),
            chunks: chunk_count,
            dimension,
            duration: started.elapsed(),
        };
        self.emit(
            run_id,
            PipelineStage::Ready,
            format!(
                "ingestion complete: {} chunks of dimension {}",
                report.chunks, report.dimension
            ),
        );
        tracing::info!(
            run_id = %run_id,
            chunks = report.chunks,
            dimension = report.dimension,
            "ingestion ready"
        );
        Ok(report)
    }

    fn emit(&self, run_id: Uuid, stage: PipelineStage, message: String) {
        tracing::debug!(run_id = %run_id, stage = %stage, "{message}");
        if let Some(sender) = &self.progress {
            let _ = sender.send(ProgressEvent::new(run_id, stage, message));
        }
    }

    fn fail(&self, run_id: Uuid, stage: PipelineStage, source: VellumError) -> IngestError {
        tracing::warn!(run_id = %run_id, stage = %stage, error = %source, "ingestion failed");
        if let Some(sender) = &self.progress {
            let _ = sender.send(ProgressEvent::new(run_id, stage, format!("failed: {source}")));
        }
        IngestError { stage, source }
    }
}

/// Builder for [`IngestionPipeline`] instances.
#[derive(Default)]
pub struct IngestionPipelineBuilder {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    config: PipelineConfig,
    progress: Option<ProgressSender>,
}

impl IngestionPipelineBuilder {
    /// Sets the embedding provider. Required before [`build`](Self::build).
    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Subscribes a progress channel to this pipeline's runs.
    #[must_use]
    pub fn progress(mut self, sender: ProgressSender) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Builds the pipeline, validating the configuration up front.
    pub fn build(self) -> Result<IngestionPipeline, VellumError> {
        let provider = self.provider.ok_or_else(|| VellumError::InvalidConfig {
            reason: "an embedding provider is required".into(),
        })?;
        self.config.validate()?;
        let embedder = Embedder::new(provider)
            .with_batching(self.config.batch_size, self.config.max_concurrency);
        Ok(IngestionPipeline {
            embedder,
            config: self.config,
            progress: self.progress,
        })
    }
}
