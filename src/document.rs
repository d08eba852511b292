//! Page-ordered document model and the extraction collaborator seam.
//!
//! Byte-level PDF parsing is not this crate's concern: anything that can
//! produce page-ordered text implements [`DocumentSource`]. The bundled
//! [`PlainTextSource`] reads UTF-8 text files and treats form feeds as page
//! breaks (the `pdftotext` convention), which keeps the pipeline drivable
//! end-to-end without a PDF parser.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::types::VellumError;

/// One page of extracted text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Zero-based page number assigned by the extractor.
    pub number: usize,
    pub text: String,
}

/// Page-ordered text extracted from a single source.
///
/// Produced once by a [`DocumentSource`] and immutable afterwards; the
/// pipeline never re-triggers extraction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    origin: String,
    pages: Vec<Page>,
}

impl Document {
    /// Creates a document from explicitly numbered pages.
    pub fn new(origin: impl Into<String>, pages: Vec<Page>) -> Self {
        Self {
            origin: origin.into(),
            pages,
        }
    }

    /// Creates a document from page texts, numbering them `0..`.
    pub fn from_page_texts<I, S>(origin: impl Into<String>, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pages = texts
            .into_iter()
            .enumerate()
            .map(|(number, text)| Page {
                number,
                text: text.into(),
            })
            .collect();
        Self::new(origin, pages)
    }

    /// The path or URI this document was extracted from.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    #[must_use]
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// `true` when there is no text to segment: zero pages, or every page
    /// empty.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|page| page.text.is_empty())
    }
}

/// Extraction collaborator: turns a file path into page-ordered text.
///
/// Implementations own all byte-level parsing, decoding, and decryption
/// concerns for their format.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Extracts a document, failing with
    /// [`VellumError::UnreadableFile`] on missing or undecodable input.
    async fn extract(&self, path: &Path) -> Result<Document, VellumError>;
}

/// Reads UTF-8 text files, splitting pages on form feed (`\x0C`).
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainTextSource;

impl PlainTextSource {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentSource for PlainTextSource {
    async fn extract(&self, path: &Path) -> Result<Document, VellumError> {
        let raw = fs::read(path)
            .await
            .map_err(|err| VellumError::UnreadableFile {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;
        let text = String::from_utf8(raw).map_err(|err| VellumError::UnreadableFile {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;

        let document =
            Document::from_page_texts(path.display().to_string(), text.split('\u{0C}'));
        tracing::debug!(
            path = %path.display(),
            pages = document.page_count(),
            "extracted plain-text document"
        );
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_texts_are_numbered_densely() {
        let document = Document::from_page_texts("doc", ["alpha", "beta", "gamma"]);
        let numbers: Vec<usize> = document.pages().iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![0, 1, 2]);
        assert_eq!(document.origin(), "doc");
    }

    #[test]
    fn blank_detection_covers_no_pages_and_empty_pages() {
        assert!(Document::new("empty", Vec::new()).is_blank());
        assert!(Document::from_page_texts("blank", ["", ""]).is_blank());
        assert!(!Document::from_page_texts("text", ["", "x"]).is_blank());
    }

    #[tokio::test]
    async fn plain_text_source_splits_on_form_feed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        tokio::fs::write(&path, "first page\u{0C}second page")
            .await
            .unwrap();

        let document = PlainTextSource::new().extract(&path).await.unwrap();
        assert_eq!(document.page_count(), 2);
        assert_eq!(document.pages()[0].text, "first page");
        assert_eq!(document.pages()[1].text, "second page");
    }

    #[tokio::test]
    async fn missing_file_is_unreadable() {
        let err = PlainTextSource::new()
            .extract(Path::new("/definitely/not/here.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, VellumError::UnreadableFile { .. }));
    }
}
