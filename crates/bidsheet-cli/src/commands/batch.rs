use bidsheet_core::deadline::Deadline;
use bidsheet_core::error::ErrorKind;
use bidsheet_core::extraction::pdftotext::PdftotextExtractor;
use bidsheet_core::model::ParseResult;
use bidsheet_core::ParseOptions;
use chrono::Utc;
use rayon::prelude::*;
use serde::Deserialize;
use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::checkpoint::{Checkpoint, DocumentRecord};
use crate::error::CliError;
use crate::fetch::Fetcher;

/// Documents per parallel round; the checkpoint is flushed after each
/// document of a round.
const CHUNK_SIZE: usize = 32;

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    /// `http(s)://` URL or local path.
    pub source: String,
}

#[derive(Debug, Default)]
struct Tally {
    ok: usize,
    empty: usize,
    failed: usize,
    unretrieved: usize,
}

impl Tally {
    fn add(&mut self, record: &DocumentRecord) {
        match &record.result {
            Some(ParseResult::Ok { .. }) => self.ok += 1,
            Some(ParseResult::Empty { .. }) => self.empty += 1,
            Some(ParseResult::Error { .. }) => self.failed += 1,
            None => self.unretrieved += 1,
        }
    }
}

pub fn run(
    manifest: PathBuf,
    checkpoint: PathBuf,
    retries: u32,
    jobs: Option<usize>,
    timeout_secs: u64,
) -> Result<(), CliError> {
    let t0 = Instant::now();
    let entries = load_manifest(&manifest)?;
    let mut store = Checkpoint::open(&checkpoint)?;

    let pending: Vec<(&ManifestEntry, u32)> = entries
        .iter()
        .filter(|e| !store.is_done(&e.id))
        .map(|e| {
            if let Some(prev) = store.get(&e.id) {
                tracing::debug!(id = %e.id, attempts = prev.attempts, "retrying unfinished document");
            }
            (e, store.attempts(&e.id))
        })
        .collect();
    tracing::info!(
        total = entries.len(),
        pending = pending.len(),
        skipped = entries.len() - pending.len(),
        "batch starting"
    );

    let fetcher = Fetcher::new(retries)?;
    let extractor = PdftotextExtractor::new();
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = jobs {
        builder = builder.num_threads(n);
    }
    let pool = builder.build()?;
    let timeout = Duration::from_secs(timeout_secs);

    let mut tally = Tally::default();
    for chunk in pending.chunks(CHUNK_SIZE) {
        let records: Vec<DocumentRecord> = pool.install(|| {
            chunk
                .par_iter()
                .map(|(entry, prior)| process_entry(entry, *prior, &fetcher, &extractor, timeout))
                .collect()
        });
        for record in records {
            tally.add(&record);
            store.record(record)?;
        }
    }

    let complete = store.records().filter(|r| r.is_done()).count();
    eprintln!(
        "Processed {} document(s) in {:.1}s: {} ok, {} empty, {} error, {} not retrieved ({} of {} complete)",
        pending.len(),
        t0.elapsed().as_secs_f64(),
        tally.ok,
        tally.empty,
        tally.failed,
        tally.unretrieved,
        complete,
        entries.len()
    );
    Ok(())
}

pub fn load_manifest(path: &Path) -> Result<Vec<ManifestEntry>, CliError> {
    let bytes = std::fs::read(path)?;
    let entries: Vec<ManifestEntry> = serde_json::from_slice(&bytes)?;

    let mut seen = HashSet::new();
    for entry in &entries {
        if entry.id.trim().is_empty() || entry.source.trim().is_empty() {
            return Err(CliError::Manifest(format!("entry '{}' has an empty id or source", entry.id)));
        }
        if !seen.insert(entry.id.as_str()) {
            return Err(CliError::Manifest(format!("duplicate id '{}'", entry.id)));
        }
    }
    Ok(entries)
}

fn process_entry(
    entry: &ManifestEntry,
    prior_attempts: u32,
    fetcher: &Fetcher,
    extractor: &PdftotextExtractor,
    timeout: Duration,
) -> DocumentRecord {
    let span = tracing::info_span!("document", id = %entry.id);
    let _guard = span.enter();

    let (result, fetch_error) = match fetcher.fetch(&entry.source) {
        Ok(bytes) => {
            let options = ParseOptions::default().with_deadline(Deadline::after(timeout));
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                super::process_bytes(&bytes, extractor, &options)
            }));
            (Some(outcome.unwrap_or_else(panic_result)), None)
        }
        Err(e) => {
            tracing::warn!(source = %entry.source, error = %e, "retrieval failed");
            (None, Some(e.to_string()))
        }
    };

    if let Some(result) = &result {
        match result.error_kind() {
            Some(kind) => tracing::warn!(%kind, "document failed"),
            None => tracing::info!(sections = result.sections().len(), "document processed"),
        }
    }

    DocumentRecord {
        id: entry.id.clone(),
        source: entry.source.clone(),
        result,
        fetch_error,
        processed_at: Utc::now(),
        attempts: prior_attempts + 1,
    }
}

/// A panic inside one document is that document's decoder fault, not the
/// batch's.
fn panic_result(payload: Box<dyn Any + Send>) -> ParseResult {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    ParseResult::Error {
        kind: ErrorKind::UnexpectedDecoderFault,
        message: format!("panic while parsing: {message}"),
    }
}
