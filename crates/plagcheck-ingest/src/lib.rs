//! Document loading and normalization.
//!
//! A [`DocumentSource`] (local path, URL, or in-memory bytes) is resolved to
//! raw lines according to its [`DocumentFormat`], then merged and segmented
//! into sentences by [`Normalizer`]. Loading never fails: unreadable or
//! unsupported sources are logged and produce empty documents.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use plagcheck_core::{BackendError, Document, PdfBackend};
use plagcheck_parsing::{NormalizeOptions, sentences_from_lines, split_body_and_references};

pub mod docx;
pub mod fetch;

pub use docx::docx_paragraphs;
pub use fetch::{Fetched, fetch_url};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("DOCX container error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("DOCX XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("PDF extraction error: {0}")]
    Pdf(#[from] BackendError),
    #[error("PDF support not available (enable the `pdf` feature of plagcheck-ingest)")]
    NoPdfSupport,
    #[error("unsupported source: {0}")]
    UnsupportedSource(String),
    #[error("extraction task failed: {0}")]
    Task(String),
}

/// Formats the normalizer can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Text,
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Map a file extension (without the dot, any case).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" | "text" | "md" => Some(Self::Text),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    /// Map an HTTP `Content-Type` value. Unrecognized types give `None`.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        if mime == "application/pdf" {
            Some(Self::Pdf)
        } else if mime.contains("wordprocessingml.document") {
            Some(Self::Docx)
        } else if mime.starts_with("text/") {
            Some(Self::Text)
        } else {
            None
        }
    }

    /// Guess from the path suffix of a URL, ignoring query and fragment.
    pub fn from_url(url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let last = path.rsplit('/').next()?;
        let (_, ext) = last.rsplit_once('.')?;
        Self::from_extension(ext)
    }
}

/// Where a document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Path(PathBuf),
    Url(String),
    Bytes {
        name: String,
        data: Vec<u8>,
        format: DocumentFormat,
    },
}

impl DocumentSource {
    /// Interpret a command-line argument: `http(s)://` is a URL, anything
    /// else a path.
    pub fn parse(arg: &str) -> Self {
        if arg.starts_with("http://") || arg.starts_with("https://") {
            Self::Url(arg.to_string())
        } else {
            Self::Path(PathBuf::from(arg))
        }
    }

    /// Display name used in reports: the file name for paths, the URL as
    /// given, the declared name for bytes.
    pub fn name(&self) -> String {
        match self {
            Self::Path(p) => p
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| p.display().to_string()),
            Self::Url(url) => url.clone(),
            Self::Bytes { name, .. } => name.clone(),
        }
    }
}

/// Resolves sources to lines and sentences.
pub struct Normalizer {
    options: NormalizeOptions,
    pdf: Option<Arc<dyn PdfBackend>>,
    client: reqwest::Client,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    /// Normalizer with default options and, when the `pdf` feature is on,
    /// the MuPDF backend.
    pub fn new() -> Self {
        Self {
            options: NormalizeOptions::default(),
            pdf: default_pdf_backend(),
            client: fetch::build_client(Duration::from_secs(60)),
        }
    }

    pub fn with_options(mut self, options: NormalizeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_pdf_backend(mut self, backend: Arc<dyn PdfBackend>) -> Self {
        self.pdf = Some(backend);
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.client = fetch::build_client(timeout);
        self
    }

    /// Unmerged lines of the source. Errors are returned, not logged.
    pub async fn try_raw_lines(&self, source: &DocumentSource) -> Result<Vec<String>, IngestError> {
        match source {
            DocumentSource::Path(path) => {
                let format = path_format(path);
                let data = tokio::fs::read(path).await?;
                self.lines_from_bytes(data, format).await
            }
            DocumentSource::Url(url) => {
                let fetched = fetch_url(&self.client, url).await?;
                self.lines_from_bytes(fetched.bytes, fetched.format).await
            }
            DocumentSource::Bytes { data, format, .. } => {
                self.lines_from_bytes(data.clone(), *format).await
            }
        }
    }

    async fn lines_from_bytes(
        &self,
        data: Vec<u8>,
        format: DocumentFormat,
    ) -> Result<Vec<String>, IngestError> {
        match format {
            DocumentFormat::Text => Ok(text_lines(&String::from_utf8_lossy(&data))),
            DocumentFormat::Docx => docx_paragraphs(&data),
            DocumentFormat::Pdf => {
                let backend = self.pdf.clone().ok_or(IngestError::NoPdfSupport)?;
                let pages = tokio::task::spawn_blocking(move || backend.extract_pages(&data))
                    .await
                    .map_err(|e| IngestError::Task(e.to_string()))??;
                Ok(pages.iter().flat_map(|page| text_lines(page)).collect())
            }
        }
    }

    /// Unmerged lines of the source; empty (and logged) on failure.
    pub async fn raw_lines(&self, source: &DocumentSource) -> Vec<String> {
        match self.try_raw_lines(source).await {
            Ok(lines) => lines,
            Err(e) => {
                tracing::error!(source = %source.name(), error = %e, "failed to read document");
                Vec::new()
            }
        }
    }

    /// Sentence sequence of the source; empty on failure.
    pub async fn normalize(&self, source: &DocumentSource) -> Vec<String> {
        self.sentences(&self.raw_lines(source).await)
    }

    /// Sentences and raw lines from a single read of the source.
    pub async fn load(&self, source: &DocumentSource) -> Document {
        let raw_lines = self.raw_lines(source).await;
        let sentences = self.sentences(&raw_lines);
        self.finish(source, sentences, raw_lines)
    }

    /// Like [`load`](Self::load), but drops the document's own references
    /// section before segmentation. Used for submissions, whose bibliography
    /// would otherwise be compared against the corpus.
    pub async fn load_body(&self, source: &DocumentSource) -> Document {
        let raw_lines = self.raw_lines(source).await;
        let (body, references) = split_body_and_references(&raw_lines.join("\n"));
        if !references.is_empty() {
            tracing::debug!(
                source = %source.name(),
                reference_lines = references.len(),
                "excluded references section"
            );
        }
        let sentences = self.sentences(&body);
        self.finish(source, sentences, raw_lines)
    }

    fn sentences(&self, lines: &[String]) -> Vec<String> {
        let lines: Vec<&str> = lines.iter().flat_map(|l| l.split('\n')).collect();
        sentences_from_lines(&lines, &self.options)
    }

    fn finish(&self, source: &DocumentSource, sentences: Vec<String>, raw_lines: Vec<String>) -> Document {
        let name = source.name();
        if sentences.is_empty() {
            tracing::warn!(source = %name, "document produced no sentences");
        } else {
            tracing::info!(source = %name, sentences = sentences.len(), "loaded document");
        }
        Document::new(name, sentences, raw_lines)
    }
}

fn text_lines(text: &str) -> Vec<String> {
    text.lines().map(String::from).collect()
}

fn path_format(path: &Path) -> DocumentFormat {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    DocumentFormat::from_extension(ext).unwrap_or_else(|| {
        tracing::warn!(path = %path.display(), "unknown extension, reading as plain text");
        DocumentFormat::Text
    })
}

#[cfg(feature = "pdf")]
fn default_pdf_backend() -> Option<Arc<dyn PdfBackend>> {
    Some(Arc::new(plagcheck_pdf_mupdf::MupdfBackend::new()))
}

#[cfg(not(feature = "pdf"))]
fn default_pdf_backend() -> Option<Arc<dyn PdfBackend>> {
    None
}
