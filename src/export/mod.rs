//! Report exporters
//!
//! Render a canonical report into downloadable byte streams. Exporters
//! consume the merged report structure only, no pipeline state.

mod csv;
mod pdf;
mod xlsx;

pub use csv::export_csv;
pub use pdf::export_pdf;
pub use xlsx::export_xlsx;

use crate::types::Report;
use std::str::FromStr;
use thiserror::Error;

/// Errors from report export
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("PDF export failed: {0}")]
    Pdf(String),
    #[error("CSV export failed: {0}")]
    Csv(String),
    #[error("Spreadsheet export failed: {0}")]
    Xlsx(String),
}

/// Artifact format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Csv,
    Xlsx,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "csv" => Ok(Self::Csv),
            "xlsx" | "excel" => Ok(Self::Xlsx),
            other => Err(format!("Unknown export format: {}", other)),
        }
    }
}

/// Export a report in the requested format
pub fn export(report: &Report, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Pdf => export_pdf(report),
        ExportFormat::Csv => export_csv(report),
        ExportFormat::Xlsx => export_xlsx(report),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("PDF".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("excel".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert!("docx".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn export_dispatches_all_formats() {
        let report = test_support::sample_report(2);
        for format in [ExportFormat::Pdf, ExportFormat::Csv, ExportFormat::Xlsx] {
            let bytes = export(&report, format).unwrap();
            assert!(!bytes.is_empty());
        }
    }
}
