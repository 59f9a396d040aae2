pub mod anchors;
pub mod boilerplate;
pub mod deadline;
pub mod diagnostics;
pub mod error;
pub mod extraction;
pub mod finalize;
pub mod model;
pub mod narrative;
pub mod segment;
pub mod strategy;
pub mod tables;
pub mod values;

use deadline::Deadline;
use error::BidsheetError;
use extraction::layout::Layout;
use extraction::{looks_scanned, Page, PdfExtractor};
use model::{Anchor, ParseResult};

/// Knobs for one parse run.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Narrative keywords starting at or right of this x (points) are body
    /// text, not field markers.
    pub narrative_max_left: f32,
    /// Vertical slack when deciding whether two tokens share a row.
    pub row_tolerance: f32,
    pub deadline: Deadline,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            narrative_max_left: 100.0,
            row_tolerance: 1.0,
            deadline: Deadline::unbounded(),
        }
    }
}

impl ParseOptions {
    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }
}

/// Main API entry point: extract a notice PDF and parse it into sections.
pub fn parse_pdf(pdf_bytes: &[u8], extractor: &dyn PdfExtractor, options: &ParseOptions) -> ParseResult {
    match extractor.extract_pages(pdf_bytes, &options.deadline) {
        Ok(pages) => parse_pages(&pages, options),
        Err(e) => {
            tracing::warn!(backend = extractor.backend_name(), error = %e, "extraction failed");
            error_result(&e)
        }
    }
}

/// Parse already-extracted pages.
///
/// Never panics on malformed input and never returns partial sections
/// alongside an error: local failures become diagnostics on an `ok` or
/// `empty` result, document-level failures an `error` result.
pub fn parse_pages(pages: &[Page], options: &ParseOptions) -> ParseResult {
    match try_parse_pages(pages, options) {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(kind = %e.kind(), error = %e, "document rejected");
            error_result(&e)
        }
    }
}

fn try_parse_pages(pages: &[Page], options: &ParseOptions) -> Result<ParseResult, BidsheetError> {
    if looks_scanned(pages) {
        return Err(BidsheetError::ScannedDocument);
    }

    let out = strategy::run(&strategy::default_strategies(), pages, options)?;
    tracing::debug!(
        sections = out.sections.len(),
        diagnostics = out.diagnostics.len(),
        elapsed_ms = options.deadline.elapsed().as_millis() as u64,
        "document parsed"
    );

    if out.sections.is_empty() {
        Ok(ParseResult::Empty {
            diagnostics: out.diagnostics,
        })
    } else {
        Ok(ParseResult::Ok {
            sections: out.sections,
            diagnostics: out.diagnostics,
        })
    }
}

/// The ordered anchor list the layout engine segments on.
pub fn locate(pages: &[Page], options: &ParseOptions) -> Result<Vec<Anchor>, BidsheetError> {
    if looks_scanned(pages) {
        return Err(BidsheetError::ScannedDocument);
    }
    let layout = Layout::build(pages, options.row_tolerance, &options.deadline)?;
    anchors::locate_anchors(&layout, options.narrative_max_left, &options.deadline)
}

fn error_result(e: &BidsheetError) -> ParseResult {
    ParseResult::Error {
        kind: e.kind(),
        message: e.to_string(),
    }
}
