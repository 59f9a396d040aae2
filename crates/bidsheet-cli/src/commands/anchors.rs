use bidsheet_core::deadline::Deadline;
use bidsheet_core::extraction::pdftotext::PdftotextExtractor;
use bidsheet_core::extraction::PdfExtractor;
use bidsheet_core::ParseOptions;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CliError;
use crate::output;

/// Print the ordered anchor list the engine would segment on.
pub fn run(pdf_file: PathBuf, output_format: &str, timeout_secs: u64) -> Result<(), CliError> {
    let pdf_bytes = std::fs::read(&pdf_file)?;
    let extractor = PdftotextExtractor::new();
    let options = ParseOptions::default().with_deadline(Deadline::after(Duration::from_secs(timeout_secs)));

    let pages = extractor.extract_pages(&pdf_bytes, &options.deadline)?;
    let anchors = bidsheet_core::locate(&pages, &options)?;
    tracing::debug!(pages = pages.len(), anchors = anchors.len(), "anchors located");

    match output_format {
        "json" => output::json::print(&anchors)?,
        _ => print!("{}", output::table::format_anchors(&anchors)),
    }
    Ok(())
}
