//! Paginated document export

use super::ExportError;
use crate::types::Report;
use crate::util::truncate_str;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use std::io::BufWriter;

const PAGE_WIDTH_MM: f32 = 215.9;
const PAGE_HEIGHT_MM: f32 = 279.4;
const MARGIN_LEFT_MM: f32 = 12.0;
const TOP_Y_MM: f32 = 266.0;
const BOTTOM_Y_MM: f32 = 18.0;
const LINE_STEP_MM: f32 = 7.0;
const FONT_SIZE: f32 = 12.0;
/// Characters per printed line before clipping
const LINE_CLIP: usize = 80;

/// Writes lines top to bottom, starting a new page when the cursor
/// reaches the bottom margin.
struct PageWriter {
    doc: PdfDocumentReference,
    font: IndirectFontRef,
    layer: PdfLayerReference,
    y: f32,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self, ExportError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ExportError::Pdf(e.to_string()))?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            font,
            layer,
            y: TOP_Y_MM,
        })
    }

    fn write_line(&mut self, text: &str) {
        if self.y < BOTTOM_Y_MM {
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = TOP_Y_MM;
        }
        self.layer.use_text(
            truncate_str(text, LINE_CLIP),
            FONT_SIZE,
            Mm(MARGIN_LEFT_MM),
            Mm(self.y),
            &self.font,
        );
        self.y -= LINE_STEP_MM;
    }

    fn finish(self) -> Result<Vec<u8>, ExportError> {
        let mut bytes = Vec::new();
        {
            let mut writer = BufWriter::new(&mut bytes);
            self.doc
                .save(&mut writer)
                .map_err(|e| ExportError::Pdf(e.to_string()))?;
        }
        Ok(bytes)
    }
}

/// Render the report as a paginated PDF: score and scan date, the summary,
/// then one record per issue.
pub fn export_pdf(report: &Report) -> Result<Vec<u8>, ExportError> {
    let mut writer = PageWriter::new("Accessibility Scan Report")?;

    writer.write_line("Accessibility Scan Report");
    writer.write_line(&format!("Score: {:.0}", report.score));
    writer.write_line(&format!(
        "Scan Date: {}",
        report.scanned_at.format("%Y-%m-%d %H:%M UTC")
    ));
    writer.write_line("");

    for line in report.summary.lines() {
        writer.write_line(line);
    }
    writer.write_line("");

    for issue in &report.issues {
        writer.write_line(&format!(
            "{} ({}): {}",
            issue.criterion, issue.severity, issue.description
        ));
        writer.write_line(&format!("Fix: {}", issue.fix));
    }

    if !report.disclaimer.is_empty() {
        writer.write_line("");
        writer.write_line(&report.disclaimer);
    }

    writer.finish()
}
