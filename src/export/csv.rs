//! Flat tabular export

use super::ExportError;
use crate::types::Report;
use ::csv::{QuoteStyle, WriterBuilder};

const HEADERS: [&str; 6] = [
    "Criterion",
    "Severity",
    "Description",
    "Fix",
    "Code Fix",
    "Category",
];

/// Render the report as CSV: one row per issue, every field quoted.
pub fn export_csv(report: &Report) -> Result<Vec<u8>, ExportError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(Vec::new());

    writer
        .write_record(HEADERS)
        .map_err(|e| ExportError::Csv(e.to_string()))?;

    for issue in &report.issues {
        let severity = issue.severity.to_string();
        let category = issue.category.to_string();
        writer
            .write_record([
                issue.criterion.as_str(),
                severity.as_str(),
                issue.description.as_str(),
                issue.fix.as_str(),
                issue.code_fix.as_deref().unwrap_or(""),
                category.as_str(),
            ])
            .map_err(|e| ExportError::Csv(e.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.to_string()))
}
