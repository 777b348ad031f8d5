use std::str::FromStr;

use thiserror::Error;

use plagcheck_core::{AggregateReport, ReferenceComparison};

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

/// Output formats for a submission report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    Json,
    Markdown,
    #[default]
    Text,
}

impl ExportFormat {
    pub fn label(self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Markdown => "Markdown",
            Self::Text => "Plain Text",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
            Self::Text => "txt",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            "text" | "txt" => Ok(Self::Text),
            other => Err(format!(
                "unknown format '{}' (expected json, markdown or text)",
                other
            )),
        }
    }
}

/// Everything a rendered report needs: the aggregate plus the
/// per-reference comparisons it was built from, in processing order.
#[derive(Debug, Clone, Copy)]
pub struct SubmissionReport<'a> {
    pub aggregate: &'a AggregateReport,
    pub comparisons: &'a [ReferenceComparison],
}
