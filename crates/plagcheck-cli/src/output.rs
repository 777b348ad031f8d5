use std::io::Write;

use owo_colors::OwoColorize;
use plagcheck_core::{
    AggregateReport, CitationStatus, DocumentCitationStatus, MatchType, ReferenceComparison,
};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}

/// Print what was loaded before the comparison starts.
pub fn print_load_summary(
    w: &mut dyn Write,
    submission: &str,
    sentences: usize,
    references: &[(String, usize)],
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w, "Submission {} ({} sentences)", submission, sentences)?;
    writeln!(w, "Comparing against {} reference documents", references.len())?;
    for (name, count) in references {
        if *count == 0 {
            let line = format!("  {} (no sentences, skipped content)", name);
            if color.enabled() {
                writeln!(w, "{}", line.yellow())?;
            } else {
                writeln!(w, "{}", line)?;
            }
        } else if color.enabled() {
            writeln!(w, "  {} {}", name, format!("({} sentences)", count).dimmed())?;
        } else {
            writeln!(w, "  {} ({} sentences)", name, count)?;
        }
    }
    writeln!(w)?;
    Ok(())
}

fn colored_score(value: f64, color: ColorMode) -> String {
    let text = format!("{:.1}%", value);
    if !color.enabled() {
        return text;
    }
    if value >= 30.0 {
        text.red().bold().to_string()
    } else if value > 0.0 {
        text.yellow().to_string()
    } else {
        text.green().to_string()
    }
}

fn citation_tag(status: CitationStatus, color: ColorMode) -> String {
    let label = match status {
        CitationStatus::ProperlyCited => "cited",
        CitationStatus::Mismatched => "MISMATCHED",
        CitationStatus::Uncited => "UNCITED",
    };
    if !color.enabled() {
        return label.to_string();
    }
    match status {
        CitationStatus::ProperlyCited => label.green().to_string(),
        CitationStatus::Mismatched => label.yellow().to_string(),
        CitationStatus::Uncited => label.red().to_string(),
    }
}

/// Per-reference overlap: blocks first, then the individual pairs.
pub fn print_comparisons(
    w: &mut dyn Write,
    comparisons: &[ReferenceComparison],
    color: ColorMode,
) -> std::io::Result<()> {
    for c in comparisons.iter().filter(|c| c.result.has_matches()) {
        writeln!(w)?;
        let sep = "=".repeat(60);
        let heading = format!(
            "{}  exact {:.1}%  partial {:.1}%",
            c.result.filename,
            c.result.exact_score * 100.0,
            c.result.partial_score * 100.0
        );
        if color.enabled() {
            writeln!(w, "{}", sep.bold())?;
            writeln!(w, "{}", heading.bold())?;
            writeln!(w, "{}", sep.bold())?;
        } else {
            writeln!(w, "{}", sep)?;
            writeln!(w, "{}", heading)?;
            writeln!(w, "{}", sep)?;
        }

        for (n, block) in c.blocks.iter().enumerate() {
            let first = block.submitted_indices.first().map_or(0, |i| i + 1);
            let last = block.submitted_indices.last().map_or(0, |i| i + 1);
            let label = format!(
                "Block {} (sentences {}-{}, avg {:.3})",
                n + 1,
                first,
                last,
                block.avg_similarity
            );
            if color.enabled() {
                writeln!(w, "{}", label.cyan())?;
                writeln!(w, "  {}", truncate(&block.submitted_text, 300))?;
                writeln!(w, "  {} {}", "source:".dimmed(), truncate(&block.reference_text, 300).dimmed())?;
            } else {
                writeln!(w, "{}", label)?;
                writeln!(w, "  {}", truncate(&block.submitted_text, 300))?;
                writeln!(w, "  source: {}", truncate(&block.reference_text, 300))?;
            }
        }

        writeln!(w)?;
        for pair in &c.result.matched_pairs {
            let kind = match pair.match_type {
                MatchType::Exact => "exact",
                MatchType::Partial => "partial",
            };
            let citation = if pair.citation_text.is_empty() {
                citation_tag(pair.citation_status, color)
            } else {
                format!(
                    "{} {}",
                    citation_tag(pair.citation_status, color),
                    pair.citation_text
                )
            };
            writeln!(
                w,
                "  #{:<4} {:<7} {:.3}  {}  {}",
                pair.submitted_index + 1,
                kind,
                pair.similarity,
                citation,
                truncate(&pair.submitted_sentence, 80)
            )?;
        }
    }
    Ok(())
}

/// Final summary block.
pub fn print_summary(
    w: &mut dyn Write,
    report: &AggregateReport,
    failed: usize,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    if color.enabled() {
        writeln!(w, "{}", "SUMMARY".bold())?;
    } else {
        writeln!(w, "SUMMARY")?;
    }
    writeln!(w, "  Submission:      {}", report.uploaded_filename)?;
    writeln!(w, "  Sentences:       {}", report.user_files.len())?;
    writeln!(w, "  Exact:           {}", colored_score(report.total_exact_score, color))?;
    writeln!(w, "  Partial:         {}", colored_score(report.total_partial_score, color))?;
    writeln!(w, "  Unique:          {:.1}%", report.unique_score)?;
    if !report.plagiarism_files.is_empty() {
        writeln!(w, "  Sources:         {}", report.plagiarism_files.join(", "))?;
    }

    let verdict = report.document_citation_status.as_str();
    let verdict = if !color.enabled() {
        verdict.to_string()
    } else {
        match report.document_citation_status {
            DocumentCitationStatus::ProperlyCited => verdict.green().to_string(),
            DocumentCitationStatus::NotProperlyCited => verdict.red().to_string(),
            DocumentCitationStatus::NoCitationsFound => verdict.dimmed().to_string(),
        }
    };
    writeln!(w, "  Citations:       {}", verdict)?;
    if !report.citations_found.is_empty() {
        writeln!(w, "  Found:           {}", report.citations_found.join("; "))?;
    }
    if failed > 0 {
        let msg = format!("  {} reference document(s) could not be compared", failed);
        if color.enabled() {
            writeln!(w, "{}", msg.yellow())?;
        } else {
            writeln!(w, "{}", msg)?;
        }
    }
    Ok(())
}

/// Numbered listing for the `sentences` dry run.
pub fn print_lines(
    w: &mut dyn Write,
    name: &str,
    lines: &[String],
    raw: bool,
    color: ColorMode,
) -> std::io::Result<()> {
    let kind = if raw { "raw lines" } else { "sentences" };
    if color.enabled() {
        writeln!(w, "{} {} ({} {})\n", "DRY RUN:".bold().cyan(), name.bold(), lines.len(), kind)?;
    } else {
        writeln!(w, "DRY RUN: {} ({} {})\n", name, lines.len(), kind)?;
    }
    for (i, line) in lines.iter().enumerate() {
        if color.enabled() {
            writeln!(w, "{} {}", format!("[{}]", i + 1).dimmed(), line)?;
        } else {
            writeln!(w, "[{}] {}", i + 1, line)?;
        }
    }
    Ok(())
}
