use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for PDF text extraction backends.
///
/// Implementors only turn PDF bytes into per-page text; line merging and
/// sentence segmentation happen in the normalizer.
pub trait PdfBackend: Send + Sync {
    /// Extract the text of every page, in page order.
    fn extract_pages(&self, data: &[u8]) -> Result<Vec<String>, BackendError>;

    /// Read a PDF from disk and extract its pages.
    fn extract_pages_from_path(&self, path: &Path) -> Result<Vec<String>, BackendError> {
        let data = std::fs::read(path)?;
        self.extract_pages(&data)
    }
}
