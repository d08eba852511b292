//! Overlapping fixed-window segmentation of page-ordered text.
//!
//! A window of `max_chunk_size` characters slides over each page with
//! stride `max_chunk_size - overlap_size`; the final window of a page is
//! clipped to the remaining text. Windows never cross a page boundary, so
//! page provenance is always recoverable from a chunk. Offsets and widths
//! count characters, not bytes, so multi-byte text never splits inside a
//! code point.

use serde::{Deserialize, Serialize};

use crate::document::{Document, Page};
use crate::types::VellumError;

/// Window parameters for [`split`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// Maximum chunk width in characters.
    pub max_chunk_size: usize,
    /// Characters shared between consecutive chunks of one page.
    pub overlap_size: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 1000,
            overlap_size: 200,
        }
    }
}

impl SegmenterConfig {
    #[must_use]
    pub fn new(max_chunk_size: usize, overlap_size: usize) -> Self {
        Self {
            max_chunk_size,
            overlap_size,
        }
    }

    /// Validates the window invariant `0 <= overlap_size < max_chunk_size`.
    pub fn validate(&self) -> Result<(), VellumError> {
        if self.max_chunk_size == 0 {
            return Err(VellumError::InvalidConfig {
                reason: "max_chunk_size must be greater than zero".into(),
            });
        }
        if self.overlap_size >= self.max_chunk_size {
            return Err(VellumError::InvalidConfig {
                reason: format!(
                    "overlap_size ({}) must be smaller than max_chunk_size ({})",
                    self.overlap_size, self.max_chunk_size
                ),
            });
        }
        Ok(())
    }

    fn stride(&self) -> usize {
        self.max_chunk_size - self.overlap_size
    }
}

/// A bounded contiguous span of one page's text; the unit of embedding and
/// indexing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Dense 0-based position across the whole document, never reset per
    /// page.
    pub id: usize,
    /// Page number this chunk was cut from.
    pub source_page: usize,
    pub text: String,
    /// Character offset of the first character within the page text.
    pub start_offset: usize,
    /// Character offset one past the last character.
    pub end_offset: usize,
}

impl Chunk {
    /// Width in characters.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.end_offset - self.start_offset
    }
}

/// Splits a document into overlapping chunks, pages in ascending page
/// number order.
///
/// # Errors
///
/// [`VellumError::InvalidConfig`] for a bad window configuration,
/// [`VellumError::EmptyDocument`] when there is no text to segment.
pub fn split(document: &Document, config: &SegmenterConfig) -> Result<Vec<Chunk>, VellumError> {
    config.validate()?;
    if document.is_blank() {
        return Err(VellumError::EmptyDocument);
    }

    let mut pages: Vec<&Page> = document.pages().iter().collect();
    pages.sort_by_key(|page| page.number);

    let stride = config.stride();
    let mut chunks = Vec::new();
    let mut next_id = 0usize;

    for page in pages {
        // Byte positions of every char boundary; the final entry closes the
        // last character so slices below always land on boundaries.
        let boundaries: Vec<usize> = page
            .text
            .char_indices()
            .map(|(byte, _)| byte)
            .chain([page.text.len()])
            .collect();
        let char_len = boundaries.len() - 1;

        let mut start = 0usize;
        while start < char_len {
            let end = usize::min(start + config.max_chunk_size, char_len);
            chunks.push(Chunk {
                id: next_id,
                source_page: page.number,
                text: page.text[boundaries[start]..boundaries[end]].to_string(),
                start_offset: start,
                end_offset: end,
            });
            next_id += 1;
            if end == char_len {
                break;
            }
            start += stride;
        }
    }

    tracing::debug!(
        chunks = chunks.len(),
        max_chunk_size = config.max_chunk_size,
        overlap_size = config.overlap_size,
        "segmented document"
    );
    Ok(chunks)
}
