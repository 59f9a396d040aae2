pub mod layout;
pub mod pdftotext;

use serde::{Deserialize, Serialize};

use crate::deadline::Deadline;
use crate::error::BidsheetError;

/// One positioned word from the PDF text layer.
///
/// Coordinates are PDF points with the origin at the top-left of the page;
/// `page` is the 0-based page index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedToken {
    pub page: usize,
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub text: String,
}

impl PositionedToken {
    pub fn new(page: usize, top: f32, bottom: f32, left: f32, text: impl Into<String>) -> Self {
        PositionedToken {
            page,
            top,
            bottom,
            left,
            text: text.into(),
        }
    }
}

/// Content extracted from a single page of a PDF.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Page {
    pub index: usize,
    /// Whole-page plain text, lines separated by `\n`.
    pub text: String,
    pub tokens: Vec<PositionedToken>,
    pub width: f32,
    pub height: f32,
}

impl Page {
    /// Build a page, ordering its tokens top-to-bottom then left-to-right.
    pub fn new(index: usize, text: String, mut tokens: Vec<PositionedToken>, width: f32, height: f32) -> Self {
        for t in &mut tokens {
            t.page = index;
        }
        tokens.sort_by(|a, b| a.top.total_cmp(&b.top).then(a.left.total_cmp(&b.left)));
        Page {
            index,
            text,
            tokens,
            width,
            height,
        }
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty() || self.tokens.iter().any(|t| !t.text.trim().is_empty())
    }
}

/// Trait for PDF text-layout extraction backends.
pub trait PdfExtractor: Send + Sync {
    /// Extract text and positioned tokens from PDF bytes, one Page per page.
    /// Backends that run out of process give up once `deadline` expires.
    fn extract_pages(&self, pdf_bytes: &[u8], deadline: &Deadline) -> Result<Vec<Page>, BidsheetError>;

    /// Name of this extraction backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

/// Decides whether a PDF is image-only before any parsing is attempted.
pub trait ScanDetector: Send + Sync {
    fn is_scanned(&self, pdf_bytes: &[u8], deadline: &Deadline) -> Result<bool, BidsheetError>;
}

/// True if no page carries any machine-readable text.
pub fn looks_scanned(pages: &[Page]) -> bool {
    !pages.iter().any(Page::has_text)
}
