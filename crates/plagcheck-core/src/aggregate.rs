//! Merge per-reference comparison results into one submission report.
//!
//! Scores here are percentages (0 to 100), unlike the per-reference
//! fractions in [`ComparisonResult`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{CitationStatus, ComparisonResult, MatchedPair};

/// Overall attribution verdict for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentCitationStatus {
    #[serde(rename = "No citations found")]
    NoCitationsFound,
    #[serde(rename = "Properly cited")]
    ProperlyCited,
    #[serde(rename = "Not properly cited")]
    NotProperlyCited,
}

impl DocumentCitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoCitationsFound => "No citations found",
            Self::ProperlyCited => "Properly cited",
            Self::NotProperlyCited => "Not properly cited",
        }
    }
}

impl std::fmt::Display for DocumentCitationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The report handed back for a submission. Field names are the wire
/// contract consumed by report storage and the frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub uploaded_filename: String,
    pub total_exact_score: f64,
    pub total_partial_score: f64,
    pub unique_score: f64,
    /// Submitted sentences.
    pub user_files: Vec<String>,
    pub exact_matches: Vec<String>,
    /// Partially matched sentences that never matched exactly anywhere.
    pub partial_matches: Vec<String>,
    /// References that contributed at least one match, in processing order.
    pub plagiarism_files: Vec<String>,
    #[serde(rename = "submittedDocument")]
    pub submitted_document: String,
    #[serde(rename = "plagiarisedSnippets")]
    pub plagiarised_snippets: Vec<String>,
    pub matched_pairs: Vec<MatchedPair>,
    pub document_citation_status: DocumentCitationStatus,
    pub citations_found: Vec<String>,
}

/// Ordered set of strings keyed on text, first occurrence wins.
#[derive(Default)]
struct OrderedSet {
    seen: HashSet<String>,
    items: Vec<String>,
}

impl OrderedSet {
    fn insert(&mut self, item: &str) {
        if self.seen.insert(item.to_string()) {
            self.items.push(item.to_string());
        }
    }

    fn contains(&self, item: &str) -> bool {
        self.seen.contains(item)
    }
}

fn percent(count: usize, total: usize) -> f64 {
    count as f64 / total as f64 * 100.0
}

/// Build the submission report from results in processing order.
///
/// Exact and partial sentences are deduplicated by text, so a sentence that
/// occurs twice in the submission is counted once.
pub fn aggregate(
    results: &[ComparisonResult],
    submitted: &[String],
    uploaded_filename: &str,
) -> AggregateReport {
    let total = submitted.len();
    if total == 0 {
        return AggregateReport {
            uploaded_filename: uploaded_filename.to_string(),
            total_exact_score: 0.0,
            total_partial_score: 0.0,
            unique_score: 100.0,
            user_files: Vec::new(),
            exact_matches: Vec::new(),
            partial_matches: Vec::new(),
            plagiarism_files: Vec::new(),
            submitted_document: String::new(),
            plagiarised_snippets: Vec::new(),
            matched_pairs: Vec::new(),
            document_citation_status: DocumentCitationStatus::NoCitationsFound,
            citations_found: Vec::new(),
        };
    }

    let mut exact = OrderedSet::default();
    let mut partial_all = OrderedSet::default();
    let mut plagiarism_files = Vec::new();
    let mut matched_pairs = Vec::new();

    for result in results {
        for sentence in &result.exact_matches {
            exact.insert(sentence);
        }
        for sentence in &result.partial_matches {
            partial_all.insert(sentence);
        }
        if result.has_matches() {
            plagiarism_files.push(result.filename.clone());
        }
        matched_pairs.extend(result.matched_pairs.iter().cloned());
    }

    let partial: Vec<String> = partial_all
        .items
        .into_iter()
        .filter(|s| !exact.contains(s))
        .collect();

    let flagged = exact.items.len() + partial.len();
    let unique_count = if flagged > total {
        tracing::error!(
            flagged,
            total,
            "more flagged sentences than submitted sentences, clamping unique count"
        );
        0
    } else {
        total - flagged
    };

    let document_citation_status = if matched_pairs.is_empty() {
        DocumentCitationStatus::NoCitationsFound
    } else if matched_pairs
        .iter()
        .all(|p| p.citation_status == CitationStatus::ProperlyCited)
    {
        DocumentCitationStatus::ProperlyCited
    } else {
        DocumentCitationStatus::NotProperlyCited
    };

    let mut citations = OrderedSet::default();
    for pair in &matched_pairs {
        if pair.citation_status == CitationStatus::ProperlyCited && !pair.citation_text.is_empty()
        {
            citations.insert(&pair.citation_text);
        }
    }

    let mut plagiarised_snippets = exact.items.clone();
    plagiarised_snippets.extend(partial.iter().cloned());

    AggregateReport {
        uploaded_filename: uploaded_filename.to_string(),
        total_exact_score: percent(exact.items.len(), total),
        total_partial_score: percent(partial.len(), total),
        unique_score: percent(unique_count, total),
        user_files: submitted.to_vec(),
        exact_matches: exact.items,
        partial_matches: partial,
        plagiarism_files,
        submitted_document: submitted.join("\n"),
        plagiarised_snippets,
        matched_pairs,
        document_citation_status,
        citations_found: citations.items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MatchType;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn pair(i: usize, status: CitationStatus, text: &str) -> MatchedPair {
        MatchedPair {
            submitted_index: i,
            submitted_sentence: format!("s{i}"),
            reference_index: 0,
            reference_sentence: "r".into(),
            similarity: 0.9,
            match_type: MatchType::Partial,
            source_file: "ref".into(),
            citation_status: status,
            citation_text: text.into(),
        }
    }

    fn result(name: &str, exact: &[&str], partial: &[&str], n: usize) -> ComparisonResult {
        ComparisonResult {
            filename: name.into(),
            exact_score: exact.len() as f64 / n as f64,
            partial_score: partial.len() as f64 / n as f64,
            unique_score: 1.0 - (exact.len() + partial.len()) as f64 / n as f64,
            total_score: 1.0,
            exact_matches: strings(exact),
            partial_matches: strings(partial),
            matched_pairs: Vec::new(),
        }
    }

    #[test]
    fn partial_excludes_sentences_exact_elsewhere() {
        let submitted = strings(&["a", "b", "c", "d"]);
        let results = vec![
            result("one.txt", &["a"], &["b"], 4),
            result("two.txt", &["b"], &["c"], 4),
            result("three.txt", &[], &[], 4),
        ];
        let report = aggregate(&results, &submitted, "sub.docx");

        assert_eq!(report.exact_matches, vec!["a", "b"]);
        assert_eq!(report.partial_matches, vec!["c"]);
        assert_eq!(report.total_exact_score, 50.0);
        assert_eq!(report.total_partial_score, 25.0);
        assert_eq!(report.unique_score, 25.0);
        assert_eq!(report.plagiarism_files, vec!["one.txt", "two.txt"]);
        assert_eq!(report.plagiarised_snippets, vec!["a", "b", "c"]);
        assert_eq!(report.submitted_document, "a\nb\nc\nd");
        assert!(
            (report.total_exact_score + report.total_partial_score + report.unique_score - 100.0)
                .abs()
                < 1e-9
        );
    }

    #[test]
    fn empty_submission_is_degenerate() {
        let report = aggregate(&[result("r", &[], &[], 1)], &[], "empty.txt");
        assert_eq!(report.total_exact_score, 0.0);
        assert_eq!(report.total_partial_score, 0.0);
        assert_eq!(report.unique_score, 100.0);
        assert!(report.plagiarism_files.is_empty());
        assert_eq!(
            report.document_citation_status,
            DocumentCitationStatus::NoCitationsFound
        );
    }

    #[test]
    fn duplicate_sentences_are_counted_once() {
        // The same sentence appears twice in the submission; text-keyed dedup
        // counts it once, leaving the copy in the unique share.
        let submitted = strings(&["copied", "copied", "fresh"]);
        let results = vec![result("r.txt", &["copied", "copied"], &[], 3)];
        let report = aggregate(&results, &submitted, "dup.txt");
        assert_eq!(report.exact_matches, vec!["copied"]);
        assert!((report.total_exact_score - 100.0 / 3.0).abs() < 1e-9);
        assert!((report.unique_score - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn verdict_follows_pair_statuses() {
        let submitted = strings(&["s0", "s1"]);
        let mut r = result("r", &[], &["s0", "s1"], 2);

        r.matched_pairs = vec![
            pair(0, CitationStatus::ProperlyCited, "(Smith, 2020)"),
            pair(1, CitationStatus::ProperlyCited, "(Smith, 2020)"),
        ];
        let report = aggregate(std::slice::from_ref(&r), &submitted, "s");
        assert_eq!(report.document_citation_status, DocumentCitationStatus::ProperlyCited);
        assert_eq!(report.citations_found, vec!["(Smith, 2020)"]);

        r.matched_pairs[1] = pair(1, CitationStatus::Mismatched, "(Jones, 2019)");
        let report = aggregate(std::slice::from_ref(&r), &submitted, "s");
        assert_eq!(
            report.document_citation_status,
            DocumentCitationStatus::NotProperlyCited
        );
        assert_eq!(report.citations_found, vec!["(Smith, 2020)"]);
    }

    #[test]
    fn no_pairs_means_no_citations_found() {
        let submitted = strings(&["x"]);
        let report = aggregate(&[result("r", &[], &[], 1)], &submitted, "s");
        assert_eq!(
            report.document_citation_status,
            DocumentCitationStatus::NoCitationsFound
        );
        assert_eq!(report.unique_score, 100.0);
    }

    #[test]
    fn wire_names() {
        let report = aggregate(&[], &strings(&["x"]), "s.txt");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["submittedDocument"], "x");
        assert!(json["plagiarisedSnippets"].is_array());
        assert_eq!(json["document_citation_status"], "No citations found");
        assert_eq!(json["uploaded_filename"], "s.txt");
    }
}
