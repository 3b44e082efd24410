//! Spreadsheet export

use super::ExportError;
use crate::types::Report;
use rust_xlsxwriter::Workbook;

const HEADERS: [&str; 6] = [
    "Criterion",
    "Severity",
    "Description",
    "Fix",
    "Code Fix",
    "Category",
];

/// Render the report as a single-sheet workbook, one row per issue.
/// A report with zero issues still gets the header row.
pub fn export_xlsx(report: &Report) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name("Scan Report")
        .map_err(|e| ExportError::Xlsx(e.to_string()))?;

    for (col, header) in HEADERS.iter().enumerate() {
        worksheet
            .write_string(0, col as u16, *header)
            .map_err(|e| ExportError::Xlsx(e.to_string()))?;
    }

    for (idx, issue) in report.issues.iter().enumerate() {
        let row = idx as u32 + 1;
        let cells = [
            issue.criterion.clone(),
            issue.severity.to_string(),
            issue.description.clone(),
            issue.fix.clone(),
            issue.code_fix.clone().unwrap_or_default(),
            issue.category.to_string(),
        ];
        for (col, value) in cells.into_iter().enumerate() {
            worksheet
                .write_string(row, col as u16, value)
                .map_err(|e| ExportError::Xlsx(e.to_string()))?;
        }
    }

    workbook
        .save_to_buffer()
        .map_err(|e| ExportError::Xlsx(e.to_string()))
}
