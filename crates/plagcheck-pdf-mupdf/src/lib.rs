use mupdf::{Document, TextPageFlags};

use plagcheck_core::{BackendError, PdfBackend};

/// MuPDF-based implementation of [`PdfBackend`].
///
/// This crate isolates the AGPL-3.0 mupdf dependency so that text and DOCX
/// ingestion do not transitively depend on it.
#[derive(Debug, Default, Clone, Copy)]
pub struct MupdfBackend;

impl MupdfBackend {
    pub fn new() -> Self {
        Self
    }
}

fn extraction_error(e: mupdf::Error) -> BackendError {
    BackendError::ExtractionError(e.to_string())
}

impl PdfBackend for MupdfBackend {
    fn extract_pages(&self, data: &[u8]) -> Result<Vec<String>, BackendError> {
        let document = Document::from_bytes(data, "application/pdf")
            .map_err(|e| BackendError::OpenError(e.to_string()))?;

        let mut pages = Vec::new();
        for page_result in document.pages().map_err(extraction_error)? {
            let page = page_result.map_err(extraction_error)?;
            let text_page = page
                .to_text_page(TextPageFlags::empty())
                .map_err(extraction_error)?;

            // One output line per layout line, in block order.
            let mut page_text = String::new();
            for block in text_page.blocks() {
                for line in block.lines() {
                    page_text.extend(line.chars().map(|c| c.char().unwrap_or('\u{FFFD}')));
                    page_text.push('\n');
                }
            }
            pages.push(page_text);
        }

        tracing::debug!(pages = pages.len(), bytes = data.len(), "extracted PDF text");
        Ok(pages)
    }
}
