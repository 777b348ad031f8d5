//! Rendering of submission reports.

mod export;
mod types;

pub use export::{export_report, render};
pub use types::{ExportFormat, ReportError, SubmissionReport};
