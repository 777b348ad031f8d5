use once_cell::sync::Lazy;
use regex::Regex;

use crate::citation_key;

/// In-text citation markers found in a single sentence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InTextCitations {
    /// `{author}_{year}` or `{author}_unknown` keys.
    pub keys: Vec<String>,
    /// IEEE numerals, one per bracket token (`[1-3]` gives `"1"` and `"3"`).
    pub ieee_numbers: Vec<String>,
    /// The literal marker substrings, in pattern order.
    pub texts: Vec<String>,
}

impl InTextCitations {
    /// No citation marker of any kind was found.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.ieee_numbers.is_empty()
    }
}

/// Extract citation markers from a sentence.
///
/// Recognized forms:
/// - `(Author, 2020)` gives `author_2020`
/// - `(Author 12)` (author + page/number) gives `author_unknown`
/// - `[3]`, `[1-4]`, `[2,5,7]` give the individual numerals
pub fn find_in_text_citations(sentence: &str) -> InTextCitations {
    static AUTHOR_YEAR: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\(([A-Z][a-zA-Z]+),\s*(\d{4})\)").unwrap());
    static AUTHOR_NUMBER: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\(([A-Z][a-zA-Z]+)\s+\d+\)").unwrap());
    static IEEE_BRACKET: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\[(\d+(?:[-,]\d+)*)\]").unwrap());

    let mut found = InTextCitations::default();

    for caps in AUTHOR_YEAR.captures_iter(sentence) {
        found.keys.push(citation_key(&caps[1], &caps[2]));
        found.texts.push(caps[0].to_string());
    }

    for caps in AUTHOR_NUMBER.captures_iter(sentence) {
        found.keys.push(citation_key(&caps[1], "unknown"));
        found.texts.push(caps[0].to_string());
    }

    for caps in IEEE_BRACKET.captures_iter(sentence) {
        found.ieee_numbers.extend(
            caps[1]
                .split(['-', ','])
                .map(String::from),
        );
        found.texts.push(caps[0].to_string());
    }

    found
}
