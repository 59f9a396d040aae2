use bidsheet_core::deadline::Deadline;
use bidsheet_core::extraction::pdftotext::PdftotextExtractor;
use bidsheet_core::model::ParseResult;
use bidsheet_core::ParseOptions;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CliError;
use crate::output;

pub fn run(
    pdf_file: PathBuf,
    output_format: &str,
    output_file: Option<PathBuf>,
    timeout_secs: u64,
) -> Result<(), CliError> {
    let pdf_bytes = std::fs::read(&pdf_file)?;
    let extractor = PdftotextExtractor::new();
    let options = ParseOptions::default().with_deadline(Deadline::after(Duration::from_secs(timeout_secs)));

    let result = super::process_bytes(&pdf_bytes, &extractor, &options);

    match output_file {
        Some(path) => {
            // Always JSON when saving to file
            let json = serde_json::to_string_pretty(&result)?;
            std::fs::write(&path, json)?;
            eprintln!(
                "Parsed {} section(s), written to {}",
                result.sections().len(),
                path.display()
            );
            for d in result.diagnostics() {
                eprintln!("  diagnostic: {}", d.message);
            }
        }
        None => match output_format {
            "json" => output::json::print(&result)?,
            _ => print!("{}", output::table::format_result(&result)),
        },
    }

    match result {
        ParseResult::Error { kind, message } => Err(CliError::Document { kind, message }),
        _ => Ok(()),
    }
}
