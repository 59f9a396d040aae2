pub mod anchors;
pub mod batch;
pub mod parse;

use bidsheet_core::error::BidsheetError;
use bidsheet_core::extraction::{PdfExtractor, ScanDetector};
use bidsheet_core::model::ParseResult;
use bidsheet_core::ParseOptions;

/// Gate on the scan detector, then run the engine. Image-only documents
/// never reach the parser.
pub fn process_bytes<E>(pdf_bytes: &[u8], extractor: &E, options: &ParseOptions) -> ParseResult
where
    E: PdfExtractor + ScanDetector,
{
    let refusal = match extractor.is_scanned(pdf_bytes, &options.deadline) {
        Ok(false) => return bidsheet_core::parse_pdf(pdf_bytes, extractor, options),
        Ok(true) => BidsheetError::ScannedDocument,
        Err(e) => e,
    };
    tracing::warn!(kind = %refusal.kind(), error = %refusal, "document not parsed");
    ParseResult::Error {
        kind: refusal.kind(),
        message: refusal.to_string(),
    }
}
