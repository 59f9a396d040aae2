use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::TableKind;

#[derive(Debug, thiserror::Error)]
pub enum BidsheetError {
    #[error("document has no machine-readable text layer (scanned image)")]
    ScannedDocument,

    #[error("no bid-section or narrative-field markers found; unsupported notice template")]
    NoAnchorsFound,

    #[error("{kind} table on page {page} is malformed: {reason}")]
    MalformedTable {
        kind: TableKind,
        page: usize,
        reason: String,
    },

    #[error("extraction exceeded its time budget after {elapsed_ms} ms")]
    ExtractionTimeout { elapsed_ms: u128 },

    #[error("text layout decoder fault: {0}")]
    UnexpectedDecoderFault(String),

    #[error("pdftotext not found. Install poppler: brew install poppler (macOS) or apt install poppler-utils (Linux)")]
    PdftotextNotFound,

    #[error("pdftotext failed with exit code {code}: {stderr}")]
    PdftotextFailed { code: i32, stderr: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Document-level failure taxonomy recorded in a `ParseResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ScannedDocument,
    NoAnchorsFound,
    MalformedTable,
    ExtractionTimeout,
    UnexpectedDecoderFault,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::ScannedDocument => "scanned_document",
            ErrorKind::NoAnchorsFound => "no_anchors_found",
            ErrorKind::MalformedTable => "malformed_table",
            ErrorKind::ExtractionTimeout => "extraction_timeout",
            ErrorKind::UnexpectedDecoderFault => "unexpected_decoder_fault",
        };
        f.write_str(s)
    }
}

impl BidsheetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BidsheetError::ScannedDocument => ErrorKind::ScannedDocument,
            BidsheetError::NoAnchorsFound => ErrorKind::NoAnchorsFound,
            BidsheetError::MalformedTable { .. } => ErrorKind::MalformedTable,
            BidsheetError::ExtractionTimeout { .. } => ErrorKind::ExtractionTimeout,
            BidsheetError::UnexpectedDecoderFault(_)
            | BidsheetError::PdftotextNotFound
            | BidsheetError::PdftotextFailed { .. }
            | BidsheetError::Io(_)
            | BidsheetError::Json(_) => ErrorKind::UnexpectedDecoderFault,
        }
    }
}
