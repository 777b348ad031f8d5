//! Citation classification for matched pairs.
//!
//! A matched reference sentence counts as attributed when a citation marker
//! appears near it in the reference document and that marker resolves to
//! either the document's own references section or the external
//! bibliographic store.

use std::collections::HashSet;
use std::sync::Mutex;

use thiserror::Error;

use plagcheck_bibstore::{BibDatabase, BibError};
use plagcheck_parsing::{ReferenceIndex, find_in_text_citations};

use crate::{CitationStatus, MatchedPair};

/// Reference sentences inspected on each side of a matched sentence.
pub const CITATION_WINDOW: usize = 2;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Bib(#[from] BibError),
    #[error("bibliographic store lock poisoned")]
    Poisoned,
}

/// Source of known `{author}_{year}` keys outside the reference document.
pub trait BibliographicStore: Send + Sync {
    fn fetch_reference_keys(&self) -> Result<HashSet<String>, StoreError>;
}

/// Fixed key set, for offline runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticBibliography {
    keys: HashSet<String>,
}

impl StaticBibliography {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl BibliographicStore for StaticBibliography {
    fn fetch_reference_keys(&self) -> Result<HashSet<String>, StoreError> {
        Ok(self.keys.clone())
    }
}

impl BibliographicStore for Mutex<BibDatabase> {
    fn fetch_reference_keys(&self) -> Result<HashSet<String>, StoreError> {
        let db = self.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(db.fetch_reference_keys()?)
    }
}

/// Markers found around one reference sentence.
#[derive(Default)]
struct WindowCitations {
    keys: HashSet<String>,
    ieee_numbers: HashSet<String>,
    texts: Vec<String>,
}

impl WindowCitations {
    fn collect(reference_sentences: &[String], center: usize, window: usize) -> Self {
        let mut found = Self::default();
        if reference_sentences.is_empty() {
            return found;
        }
        let start = center.saturating_sub(window);
        let end = center
            .saturating_add(window)
            .min(reference_sentences.len() - 1);
        if start > end {
            return found;
        }
        for sentence in &reference_sentences[start..=end] {
            let markers = find_in_text_citations(sentence);
            found.keys.extend(markers.keys);
            found.ieee_numbers.extend(markers.ieee_numbers);
            for text in markers.texts {
                if !found.texts.contains(&text) {
                    found.texts.push(text);
                }
            }
        }
        found
    }

    fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.ieee_numbers.is_empty()
    }
}

/// Set `citation_status` and `citation_text` on every pair.
///
/// `reference_raw_lines` is the unmerged extraction of the reference
/// document, used to find its references section. The store is queried at
/// most once; a failing store is logged and treated as empty.
pub fn classify(
    pairs: &mut [MatchedPair],
    reference_sentences: &[String],
    reference_raw_lines: &[String],
    store: Option<&dyn BibliographicStore>,
    window: usize,
) {
    if pairs.is_empty() {
        return;
    }

    let references = ReferenceIndex::from_document_lines(reference_raw_lines);
    let store_keys = match store.map(|s| s.fetch_reference_keys()) {
        Some(Ok(keys)) => keys,
        Some(Err(e)) => {
            tracing::warn!(error = %e, "bibliographic store lookup failed, continuing without it");
            HashSet::new()
        }
        None => HashSet::new(),
    };
    tracing::debug!(
        reference_keys = references.keys.len(),
        ieee_entries = references.ieee.len(),
        store_keys = store_keys.len(),
        "citation classification"
    );

    for pair in pairs.iter_mut() {
        let found = WindowCitations::collect(reference_sentences, pair.reference_index, window);

        pair.citation_status = if found.is_empty() {
            CitationStatus::Uncited
        } else if found
            .ieee_numbers
            .iter()
            .any(|n| references.ieee.contains_key(n))
            || found
                .keys
                .iter()
                .any(|k| references.keys.contains(k) || store_keys.contains(k))
        {
            CitationStatus::ProperlyCited
        } else {
            CitationStatus::Mismatched
        };
        pair.citation_text = found.texts.join(", ");
    }
}
