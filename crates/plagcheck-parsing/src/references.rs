use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

use crate::citation_key;

/// Whether a line is a bare `References` / `Bibliography` header.
pub fn is_references_header(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.eq_ignore_ascii_case("references") || trimmed.eq_ignore_ascii_case("bibliography")
}

/// Return the lines following the FIRST references header, or an empty
/// slice when the document has none.
///
/// Operates on raw (unmerged) lines: header detection depends on the
/// original line breaks.
pub fn find_references_section<S: AsRef<str>>(lines: &[S]) -> &[S] {
    lines
        .iter()
        .position(|l| is_references_header(l.as_ref()))
        .map(|i| &lines[i + 1..])
        .unwrap_or(&[])
}

/// Citation keys recovered from a references section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceIndex {
    /// `{author}_{year}` keys from author-year style entries.
    pub keys: HashSet<String>,
    /// IEEE numeral (`"3"` for `[3] ...`) to the entry text after the bracket.
    pub ieee: BTreeMap<String, String>,
}

impl ReferenceIndex {
    /// Locate the references section in `lines` and normalize it.
    pub fn from_document_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        normalize_references(find_references_section(lines))
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.ieee.is_empty()
    }
}

/// Normalize reference entries into keys.
///
/// Three independent passes run on every line:
/// 1. `[n] text` entries go into the IEEE map;
/// 2. a loose `Capitalized ... YYYY` pattern;
/// 3. a stricter `Surname, Firstname ... YYYY` pattern.
///
/// Passes 2 and 3 feed the same key set.
pub fn normalize_references<S: AsRef<str>>(ref_lines: &[S]) -> ReferenceIndex {
    static IEEE_ENTRY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[(\d+)\]\s*(.*)").unwrap());
    static LOOSE_AUTHOR_YEAR: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\b([A-Z][a-zA-Z]+)[^\n]*?(\d{4})").unwrap());
    static SURNAME_FIRSTNAME_YEAR: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\b([A-Z][a-zA-Z]+),\s+[A-Z][a-zA-Z]+.*?(\d{4})").unwrap());

    let mut index = ReferenceIndex::default();

    for line in ref_lines {
        let line = line.as_ref();

        if let Some(caps) = IEEE_ENTRY.captures(line) {
            index
                .ieee
                .insert(caps[1].to_string(), caps[2].to_string());
        }

        for re in [&*LOOSE_AUTHOR_YEAR, &*SURNAME_FIRSTNAME_YEAR] {
            if let Some(caps) = re.captures(line) {
                index.keys.insert(citation_key(&caps[1], &caps[2]));
            }
        }
    }

    index
}

/// Split full text into body lines and reference lines.
///
/// Lines are trimmed and blank ones dropped. The split happens at the LAST
/// references header so a "References" heading inside the body (a table
/// title, a related-work subsection) does not swallow the rest of the
/// document. Without a header, everything is body.
pub fn split_body_and_references(full_text: &str) -> (Vec<String>, Vec<String>) {
    let lines: Vec<String> = full_text
        .trim()
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect();

    match lines.iter().rposition(|l| is_references_header(l)) {
        Some(idx) => {
            let references = lines[idx + 1..].to_vec();
            let mut body = lines;
            body.truncate(idx);
            (body, references)
        }
        None => (lines, Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_references_header() {
        assert!(is_references_header("References"));
        assert!(is_references_header("  BIBLIOGRAPHY \t"));
        assert!(!is_references_header("References and notes"));
        assert!(!is_references_header("2 References"));
    }

    #[test]
    fn test_find_references_section_first_header() {
        let lines = [
            "Body text.",
            "References",
            "[1] First.",
            "references",
            "[2] Second.",
        ];
        let section = find_references_section(&lines);
        assert_eq!(section, &["[1] First.", "references", "[2] Second."]);
    }

    #[test]
    fn test_find_references_section_missing() {
        let lines = ["No bibliography here.", "Just prose."];
        assert!(find_references_section(&lines).is_empty());
    }

    #[test]
    fn test_find_references_section_header_last_line() {
        let lines = ["Body.", "Bibliography"];
        assert!(find_references_section(&lines).is_empty());
    }

    #[test]
    fn test_normalize_author_year_entry() {
        let index = normalize_references(&["Smith, J. (2020). Title of the work. Journal."]);
        assert!(index.keys.contains("smith_2020"));
        assert!(index.ieee.is_empty());
    }

    #[test]
    fn test_normalize_surname_firstname_entry() {
        let index = normalize_references(&["Jones, Alice and Bob Miller. A study. 2018."]);
        assert!(index.keys.contains("jones_2018"));
    }

    #[test]
    fn test_normalize_ieee_entry() {
        let index = normalize_references(&["[3] A. Author, \"Paper title,\" in Proc. Conf., 2019."]);
        assert_eq!(
            index.ieee.get("3").map(String::as_str),
            Some("A. Author, \"Paper title,\" in Proc. Conf., 2019.")
        );
        // The loose pass still picks up an author-year key from the same line.
        assert!(index.keys.contains("author_2019"));
    }

    #[test]
    fn test_normalize_ignores_lines_without_year() {
        let index = normalize_references(&["Smith, John. Undated manuscript."]);
        assert!(index.keys.is_empty());
    }

    #[test]
    fn test_reference_index_from_document_lines() {
        let lines = [
            "As shown by (Smith, 2020) the effect holds.",
            "References",
            "Smith, J. (2020). Title.",
        ];
        let index = ReferenceIndex::from_document_lines(&lines);
        assert!(index.keys.contains("smith_2020"));
        assert!(!index.is_empty());

        let none = ReferenceIndex::from_document_lines(&["Nothing to see."]);
        assert!(none.is_empty());
    }

    #[test]
    fn test_split_body_and_references_uses_last_header() {
        let text = "Intro line.\nReferences\nTable text.\n\nREFERENCES\n[1] Ref one.\n  [2] Ref two.  \n";
        let (body, refs) = split_body_and_references(text);
        assert_eq!(body, vec!["Intro line.", "References", "Table text."]);
        assert_eq!(refs, vec!["[1] Ref one.", "[2] Ref two."]);
    }

    #[test]
    fn test_split_body_and_references_without_header() {
        let (body, refs) = split_body_and_references("One.\n\nTwo.");
        assert_eq!(body, vec!["One.", "Two."]);
        assert!(refs.is_empty());
    }
}
