//! Vellum: document ingestion and similarity search over embedded chunks.
//!
//! ```text
//! PDF extraction collaborator ──► document::Document (page-ordered text)
//!
//! Document ──► segmenter::split ──► ordered [Chunk]
//!                                        │
//!          embedder::Embedder (batched, order-preserving) ──► [vector]
//!                                        │
//! chunks ⊕ vectors ──► index::FlatIndex::insert ──► similarity queries
//!                                        │
//!                    index snapshots ──► save / load round-trips
//! ```
//!
//! The [`pipeline::IngestionPipeline`] wires the three stages, attributes
//! the first failure to the stage that was active, and reports progress as
//! structured [`events::ProgressEvent`] values instead of printed status
//! lines. External collaborators (PDF extraction, the embedding model,
//! persistence) stay behind narrow traits so the pipeline owns only the
//! algorithmic core: segmentation policy, embedding orchestration, and
//! nearest-neighbor search.

pub mod document;
pub mod embedder;
pub mod events;
pub mod index;
pub mod pipeline;
pub mod segmenter;
pub mod types;

pub use document::{Document, DocumentSource, Page, PlainTextSource};
pub use embedder::{
    Embedder, EmbeddingProvider, EmbeddingVector, HttpEmbeddingProvider, MockEmbeddingProvider,
    ProviderError,
};
pub use events::{ProgressEvent, ProgressReceiver, ProgressSender, progress_channel};
pub use index::{FlatIndex, IndexEntry, IndexSnapshot, Metric, SearchHit, VectorIndex};
pub use pipeline::{
    IngestError, IngestReport, IngestionPipeline, PipelineConfig, PipelineStage,
};
pub use segmenter::{Chunk, SegmenterConfig, split};
pub use types::VellumError;
