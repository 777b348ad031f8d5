use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod aggregate;
pub mod backend;
pub mod blocks;
pub mod citation;
pub mod config_file;
pub mod embedding;
pub mod orchestrator;
pub mod similarity;

// Re-export for convenience
pub use aggregate::{AggregateReport, DocumentCitationStatus, aggregate};
pub use backend::{BackendError, PdfBackend};
pub use blocks::{Block, group_blocks};
pub use citation::{
    BibliographicStore, CITATION_WINDOW, StaticBibliography, StoreError, classify,
};
pub use embedding::{EmbedError, Embedder, Embeddings, HashingEmbedder, HttpEmbedder};
#[cfg(feature = "fastembed")]
pub use embedding::FastEmbedder;
pub use orchestrator::{ProgressEvent, ReferenceComparison, compare_corpus, compare_reference};
pub use similarity::{Thresholds, compare, compare_embedded};

/// A normalized document ready for comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// Display name (file name or URL) used in reports.
    pub name: String,
    /// Sentences in reading order.
    pub sentences: Vec<String>,
    /// Unmerged source lines, used only for references-section detection.
    pub raw_lines: Vec<String>,
}

impl Document {
    pub fn new(name: impl Into<String>, sentences: Vec<String>, raw_lines: Vec<String>) -> Self {
        Self {
            name: name.into(),
            sentences,
            raw_lines,
        }
    }

    /// Build a document whose raw lines are its sentences.
    pub fn from_sentences(name: impl Into<String>, sentences: Vec<String>) -> Self {
        let raw_lines = sentences.clone();
        Self::new(name, sentences, raw_lines)
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }
}

/// How closely a submitted sentence matched its best reference sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Partial,
}

/// Attribution state of a matched pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationStatus {
    #[default]
    Uncited,
    ProperlyCited,
    Mismatched,
}

impl CitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uncited => "uncited",
            Self::ProperlyCited => "properly_cited",
            Self::Mismatched => "mismatched",
        }
    }
}

/// One submitted sentence paired with its best-matching reference sentence.
///
/// Serialized field names are part of the report wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedPair {
    #[serde(rename = "doc1_idx")]
    pub submitted_index: usize,
    #[serde(rename = "doc1_sentence")]
    pub submitted_sentence: String,
    #[serde(rename = "doc2_idx")]
    pub reference_index: usize,
    #[serde(rename = "doc2_sentence")]
    pub reference_sentence: String,
    pub similarity: f64,
    #[serde(rename = "type")]
    pub match_type: MatchType,
    pub source_file: String,
    #[serde(default)]
    pub citation_status: CitationStatus,
    #[serde(default)]
    pub citation_text: String,
}

/// Result of comparing the submitted document against one reference
/// document. Scores are fractions in `[0, 1]`, rounded to four decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Reference document display name.
    pub filename: String,
    pub exact_score: f64,
    pub partial_score: f64,
    pub unique_score: f64,
    pub total_score: f64,
    /// Submitted sentences matched exactly, in document order.
    pub exact_matches: Vec<String>,
    /// Submitted sentences matched as paraphrases, in document order.
    pub partial_matches: Vec<String>,
    pub matched_pairs: Vec<MatchedPair>,
}

impl ComparisonResult {
    /// The degenerate result: nothing matched, everything unique.
    pub fn unmatched(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            exact_score: 0.0,
            partial_score: 0.0,
            unique_score: 1.0,
            total_score: 1.0,
            exact_matches: Vec::new(),
            partial_matches: Vec::new(),
            matched_pairs: Vec::new(),
        }
    }

    pub fn has_matches(&self) -> bool {
        self.exact_score > 0.0 || self.partial_score > 0.0
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbedError),
    #[error("embedding timed out after {0:?}")]
    Timeout(Duration),
    #[error("bibliographic store error: {0}")]
    Store(#[from] StoreError),
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Configuration for a comparison run.
#[derive(Clone)]
pub struct Config {
    /// Similarity at or above which a match is exact.
    pub exact_threshold: f64,
    /// Similarity at or above which a match is partial.
    pub match_threshold: f64,
    /// Reference sentences inspected on each side of a match for citations.
    pub citation_window: usize,
    /// Reference documents compared concurrently.
    pub num_workers: usize,
    pub embed_timeout_secs: u64,
    /// External bibliography consulted once per classification pass.
    pub bib_store: Option<Arc<dyn BibliographicStore>>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("exact_threshold", &self.exact_threshold)
            .field("match_threshold", &self.match_threshold)
            .field("citation_window", &self.citation_window)
            .field("num_workers", &self.num_workers)
            .field("embed_timeout_secs", &self.embed_timeout_secs)
            .field("bib_store", &self.bib_store.as_ref().map(|_| "<open>"))
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        Self {
            exact_threshold: thresholds.exact,
            match_threshold: thresholds.partial,
            citation_window: CITATION_WINDOW,
            num_workers: 4,
            embed_timeout_secs: 60,
            bib_store: None,
        }
    }
}

impl Config {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            exact: self.exact_threshold,
            partial: self.match_threshold,
        }
    }

    pub fn embed_timeout(&self) -> Duration {
        Duration::from_secs(self.embed_timeout_secs)
    }

    /// Reject threshold and worker settings that cannot produce a sane run.
    pub fn validate(&self) -> Result<(), CoreError> {
        let in_range = |t: f64| (-1.0..=1.0).contains(&t);
        if !in_range(self.exact_threshold) || !in_range(self.match_threshold) {
            return Err(CoreError::Config(format!(
                "thresholds must lie in [-1, 1] (exact={}, match={})",
                self.exact_threshold, self.match_threshold
            )));
        }
        if self.match_threshold > self.exact_threshold {
            return Err(CoreError::Config(format!(
                "match threshold {} exceeds exact threshold {}",
                self.match_threshold, self.exact_threshold
            )));
        }
        if self.num_workers == 0 {
            return Err(CoreError::Config("num_workers must be at least 1".into()));
        }
        Ok(())
    }
}
