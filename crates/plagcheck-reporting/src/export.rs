use std::io::Write;
use std::path::Path;

use serde::Serialize;

use plagcheck_core::{Block, MatchedPair, ReferenceComparison};

use crate::types::{ExportFormat, ReportError, SubmissionReport};

/// Render `report` in `format`.
pub fn render(report: &SubmissionReport<'_>, format: ExportFormat) -> Result<String, ReportError> {
    Ok(match format {
        ExportFormat::Json => export_json(report)?,
        ExportFormat::Markdown => export_markdown(report),
        ExportFormat::Text => export_text(report),
    })
}

/// Render `report` and write it to `path`.
pub fn export_report(
    report: &SubmissionReport<'_>,
    format: ExportFormat,
    path: &Path,
) -> Result<(), ReportError> {
    let content = render(report, format)?;
    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;
    tracing::info!(path = %path.display(), format = format.label(), "wrote report");
    Ok(())
}

#[derive(Serialize)]
struct JsonReference<'a> {
    filename: &'a str,
    exact_score: f64,
    partial_score: f64,
    unique_score: f64,
    blocks: &'a [Block],
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    aggregate: &'a plagcheck_core::AggregateReport,
    references: Vec<JsonReference<'a>>,
}

/// The aggregate wire object, plus a `references` array with per-source
/// scores and blocks.
fn export_json(report: &SubmissionReport<'_>) -> Result<String, ReportError> {
    let references = report
        .comparisons
        .iter()
        .map(|c| JsonReference {
            filename: &c.result.filename,
            exact_score: c.result.exact_score,
            partial_score: c.result.partial_score,
            unique_score: c.result.unique_score,
            blocks: &c.blocks,
        })
        .collect();
    Ok(serde_json::to_string_pretty(&JsonReport {
        aggregate: report.aggregate,
        references,
    })?)
}

/// Per-reference scores are fractions; report them as percentages.
fn pct(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

fn md_escape(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

fn index_range(indices: &[usize]) -> String {
    match (indices.first(), indices.last()) {
        (Some(first), Some(last)) if first != last => format!("{}-{}", first + 1, last + 1),
        (Some(first), _) => format!("{}", first + 1),
        _ => String::new(),
    }
}

fn citation_label(pair: &MatchedPair) -> String {
    if pair.citation_text.is_empty() {
        pair.citation_status.as_str().to_string()
    } else {
        format!("{} {}", pair.citation_status.as_str(), pair.citation_text)
    }
}

fn matched(comparisons: &[ReferenceComparison]) -> impl Iterator<Item = &ReferenceComparison> {
    comparisons.iter().filter(|c| c.result.has_matches())
}

fn export_markdown(report: &SubmissionReport<'_>) -> String {
    let agg = report.aggregate;
    let mut out = format!("# Plagiarism Report: {}\n\n", md_escape(&agg.uploaded_filename));

    out.push_str(&format!(
        "**{:.1}%** exact | **{:.1}%** partial | **{:.1}%** unique | **{}** sentences | citations: **{}**\n\n",
        agg.total_exact_score,
        agg.total_partial_score,
        agg.unique_score,
        agg.user_files.len(),
        agg.document_citation_status,
    ));

    if !report.comparisons.is_empty() {
        out.push_str("## Sources\n\n");
        out.push_str("| Reference | Exact | Partial | Unique | Blocks |\n");
        out.push_str("|-----------|-------|---------|--------|--------|\n");
        for c in report.comparisons {
            out.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                md_escape(&c.result.filename),
                pct(c.result.exact_score),
                pct(c.result.partial_score),
                pct(c.result.unique_score),
                c.blocks.len(),
            ));
        }
        out.push('\n');
    }

    for c in matched(report.comparisons) {
        out.push_str(&format!("## {}\n\n", md_escape(&c.result.filename)));

        for (n, block) in c.blocks.iter().enumerate() {
            out.push_str(&format!(
                "### Block {} (sentences {}, avg similarity {:.3})\n\n",
                n + 1,
                index_range(&block.submitted_indices),
                block.avg_similarity,
            ));
            out.push_str(&format!("> {}\n\n", block.submitted_text));
            out.push_str(&format!(
                "Source (sentences {}):\n\n> {}\n\n",
                index_range(&block.reference_indices),
                block.reference_text,
            ));
        }

        out.push_str("| # | Type | Similarity | Citation | Sentence |\n");
        out.push_str("|---|------|------------|----------|----------|\n");
        for pair in &c.result.matched_pairs {
            out.push_str(&format!(
                "| {} | {:?} | {:.3} | {} | {} |\n",
                pair.submitted_index + 1,
                pair.match_type,
                pair.similarity,
                md_escape(&citation_label(pair)),
                md_escape(&pair.submitted_sentence),
            ));
        }
        out.push('\n');
    }

    if !agg.citations_found.is_empty() {
        out.push_str("## Citations Found\n\n");
        for citation in &agg.citations_found {
            out.push_str(&format!("- {}\n", citation));
        }
        out.push('\n');
    }

    out
}

fn export_text(report: &SubmissionReport<'_>) -> String {
    let agg = report.aggregate;
    let title = format!("Plagiarism Report: {}", agg.uploaded_filename);
    let mut out = format!("{}\n{}\n", title, "=".repeat(title.chars().count()));

    out.push_str(&format!(
        "  {:.1}% exact | {:.1}% partial | {:.1}% unique | {} sentences\n",
        agg.total_exact_score,
        agg.total_partial_score,
        agg.unique_score,
        agg.user_files.len(),
    ));
    out.push_str(&format!("  Citations: {}\n", agg.document_citation_status));
    if !agg.citations_found.is_empty() {
        out.push_str(&format!("  Found: {}\n", agg.citations_found.join("; ")));
    }

    for c in report.comparisons {
        let heading = format!(
            "{} (exact {}, partial {}, unique {})",
            c.result.filename,
            pct(c.result.exact_score),
            pct(c.result.partial_score),
            pct(c.result.unique_score),
        );
        out.push_str(&format!("\n{}\n{}\n", heading, "-".repeat(heading.chars().count())));

        if !c.result.has_matches() {
            out.push_str("  no overlap\n");
            continue;
        }
        for block in &c.blocks {
            out.push_str(&format!(
                "  [{}] ~{:.3}  {}\n",
                index_range(&block.submitted_indices),
                block.avg_similarity,
                block.submitted_text,
            ));
            out.push_str(&format!(
                "       source [{}]: {}\n",
                index_range(&block.reference_indices),
                block.reference_text,
            ));
        }
        for pair in &c.result.matched_pairs {
            out.push_str(&format!(
                "  #{} {:?} {:.3} {}\n",
                pair.submitted_index + 1,
                pair.match_type,
                pair.similarity,
                citation_label(pair),
            ));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use plagcheck_core::{
        AggregateReport, CitationStatus, ComparisonResult, MatchType, aggregate, group_blocks,
    };

    fn pair(i: usize, j: usize, status: CitationStatus, text: &str) -> MatchedPair {
        MatchedPair {
            submitted_index: i,
            submitted_sentence: format!("Submitted sentence {i}."),
            reference_index: j,
            reference_sentence: format!("Reference sentence {j}."),
            similarity: 0.97,
            match_type: MatchType::Exact,
            source_file: "source.pdf".into(),
            citation_status: status,
            citation_text: text.into(),
        }
    }

    fn fixture() -> (AggregateReport, Vec<ReferenceComparison>) {
        let submitted: Vec<String> = (0..4).map(|i| format!("Submitted sentence {i}.")).collect();
        let reference: Vec<String> = (0..3).map(|i| format!("Reference sentence {i}.")).collect();
        let pairs = vec![
            pair(1, 0, CitationStatus::ProperlyCited, "(Smith, 2020)"),
            pair(2, 1, CitationStatus::Uncited, ""),
        ];
        let result = ComparisonResult {
            filename: "source.pdf".into(),
            exact_score: 0.5,
            partial_score: 0.0,
            unique_score: 0.5,
            total_score: 1.0,
            exact_matches: vec![submitted[1].clone(), submitted[2].clone()],
            partial_matches: Vec::new(),
            matched_pairs: pairs.clone(),
        };
        let blocks = group_blocks(&pairs, &submitted, &reference);
        let comparisons = vec![
            ReferenceComparison {
                index: 0,
                result,
                blocks,
            },
            ReferenceComparison {
                index: 1,
                result: ComparisonResult::unmatched("clean.txt"),
                blocks: Vec::new(),
            },
        ];
        let results: Vec<_> = comparisons.iter().map(|c| c.result.clone()).collect();
        (aggregate(&results, &submitted, "essay.docx"), comparisons)
    }

    #[test]
    fn json_keeps_wire_fields_and_adds_references() {
        let (agg, comparisons) = fixture();
        let report = SubmissionReport {
            aggregate: &agg,
            comparisons: &comparisons,
        };
        let json: serde_json::Value =
            serde_json::from_str(&render(&report, ExportFormat::Json).unwrap()).unwrap();
        assert_eq!(json["uploaded_filename"], "essay.docx");
        assert_eq!(json["total_exact_score"], 50.0);
        assert_eq!(json["document_citation_status"], "Not properly cited");
        assert_eq!(json["matched_pairs"][0]["doc1_idx"], 1);
        assert_eq!(json["references"].as_array().unwrap().len(), 2);
        assert_eq!(
            json["references"][0]["blocks"][0]["submitted_indices"],
            serde_json::json!([1, 2])
        );
    }

    #[test]
    fn markdown_lists_blocks_for_matching_sources_only() {
        let (agg, comparisons) = fixture();
        let report = SubmissionReport {
            aggregate: &agg,
            comparisons: &comparisons,
        };
        let md = render(&report, ExportFormat::Markdown).unwrap();
        assert!(md.starts_with("# Plagiarism Report: essay.docx"));
        assert!(md.contains("### Block 1 (sentences 2-3, avg similarity 0.970)"));
        assert!(md.contains("| clean.txt | 0.0% | 0.0% | 100.0% | 0 |"));
        assert!(!md.contains("## clean.txt"));
        assert!(md.contains("properly_cited (Smith, 2020)"));
        assert!(md.contains("## Citations Found"));
    }

    #[test]
    fn text_marks_clean_sources() {
        let (agg, comparisons) = fixture();
        let report = SubmissionReport {
            aggregate: &agg,
            comparisons: &comparisons,
        };
        let text = render(&report, ExportFormat::Text).unwrap();
        assert!(text.contains("50.0% exact"));
        assert!(text.contains("Citations: Not properly cited"));
        assert!(text.contains("no overlap"));
        assert!(text.contains("#3 Exact 0.970 uncited"));
    }

    #[test]
    fn export_writes_file() {
        let (agg, comparisons) = fixture();
        let report = SubmissionReport {
            aggregate: &agg,
            comparisons: &comparisons,
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        export_report(&report, ExportFormat::Markdown, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, render(&report, ExportFormat::Markdown).unwrap());
    }

    #[test]
    fn index_range_formats() {
        assert_eq!(index_range(&[4]), "5");
        assert_eq!(index_range(&[1, 2, 3]), "2-4");
        assert_eq!(index_range(&[]), "");
    }
}
