//! Crate-wide error taxonomy.
//!
//! Every component fails fast with one of these variants; the pipeline
//! orchestrator wraps them with the stage that was active (see
//! [`crate::pipeline::IngestError`]) but never converts or swallows them.

use std::path::PathBuf;

use thiserror::Error;

/// Typed failures surfaced by segmentation, embedding, and indexing.
#[derive(Debug, Error)]
pub enum VellumError {
    /// Bad caller-supplied parameters. Not retryable.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The document has zero pages or no text on any page.
    #[error("document has no text to segment")]
    EmptyDocument,

    /// A query was issued before anything was inserted.
    #[error("index is empty: nothing has been inserted yet")]
    EmptyIndex,

    /// The embedding provider failed for one batch. Retryable by
    /// re-embedding the reported chunk-id range.
    #[error("embedding provider failed for chunks {first_chunk}..={last_chunk}: {message}")]
    EmbeddingProvider {
        first_chunk: usize,
        last_chunk: usize,
        message: String,
    },

    /// Vector length disagrees with the index's established dimension.
    /// Indicates model/index version skew; the index must be rebuilt.
    #[error("vector dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The extraction collaborator could not read its input.
    #[error("unreadable file {path}: {reason}")]
    UnreadableFile { path: PathBuf, reason: String },

    /// Snapshot serialization or deserialization failed.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("io error: {0}")]
    Io(String),
}

impl VellumError {
    /// Whether the caller can reasonably retry the failed operation.
    ///
    /// Only provider failures are transient; everything else signals a
    /// caller bug, absent data, or configuration skew.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, VellumError::EmbeddingProvider { .. })
    }
}

impl From<std::io::Error> for VellumError {
    fn from(err: std::io::Error) -> Self {
        VellumError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_failures_are_the_only_retryable_class() {
        let provider = VellumError::EmbeddingProvider {
            first_chunk: 4,
            last_chunk: 7,
            message: "timeout".into(),
        };
        assert!(provider.is_retryable());

        let mismatch = VellumError::DimensionMismatch {
            expected: 8,
            actual: 4,
        };
        assert!(!mismatch.is_retryable());
        assert!(!VellumError::EmptyIndex.is_retryable());
    }

    #[test]
    fn provider_error_names_the_failed_range() {
        let err = VellumError::EmbeddingProvider {
            first_chunk: 12,
            last_chunk: 15,
            message: "503".into(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("12..=15"), "got: {rendered}");
    }
}
