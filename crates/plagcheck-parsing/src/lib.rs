//! Text-level parsing for overlap detection.
//!
//! Everything in this crate is a pure function over strings: line merging and
//! sentence segmentation for the normalizer, references-section detection and
//! reference-key normalization, and in-text citation marker extraction.

pub mod citations;
pub mod references;
pub mod sentences;

pub use citations::{InTextCitations, find_in_text_citations};
pub use references::{
    ReferenceIndex, find_references_section, is_references_header, normalize_references,
    split_body_and_references,
};
pub use sentences::{
    NormalizeOptions, SEGMENT_MIN_WORDS, ends_sentence, merge_broken_lines, segment_lines,
    sentences_from_lines, split_sentences,
};

/// Build the `{author}_{year}` key used for citation set-membership tests.
///
/// The author is lowercased; `year` is passed through verbatim so callers can
/// use `"unknown"` when no date is recorded.
pub fn citation_key(author: &str, year: &str) -> String {
    format!("{}_{}", author.to_lowercase(), year)
}
