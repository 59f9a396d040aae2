//! Checkpointed batch store: one JSON file mapping document id to the last
//! outcome recorded for it.
//!
//! The file is rewritten through a temp file in the same directory and
//! renamed into place, so an interrupted run leaves either the previous or
//! the new checkpoint, never a truncated one.

use bidsheet_core::model::ParseResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub source: String,
    /// Parse outcome; absent when the document could not be retrieved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ParseResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_error: Option<String>,
    pub processed_at: DateTime<Utc>,
    pub attempts: u32,
}

impl DocumentRecord {
    /// `ok` and `empty` outcomes are final; errors and failed retrievals
    /// are retried on the next run.
    pub fn is_done(&self) -> bool {
        matches!(
            self.result,
            Some(ParseResult::Ok { .. } | ParseResult::Empty { .. })
        )
    }
}

pub struct Checkpoint {
    path: PathBuf,
    records: BTreeMap<String, DocumentRecord>,
}

impl Checkpoint {
    /// Load the checkpoint at `path`; a missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let records = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), records = records.len(), "checkpoint loaded");
        Ok(Checkpoint { path, records })
    }

    pub fn get(&self, id: &str) -> Option<&DocumentRecord> {
        self.records.get(id)
    }

    pub fn is_done(&self, id: &str) -> bool {
        self.records.get(id).is_some_and(DocumentRecord::is_done)
    }

    pub fn attempts(&self, id: &str) -> u32 {
        self.records.get(id).map_or(0, |r| r.attempts)
    }

    pub fn records(&self) -> impl Iterator<Item = &DocumentRecord> {
        self.records.values()
    }

    /// Store `record`, replacing any earlier one for its id, and flush.
    pub fn record(&mut self, record: DocumentRecord) -> Result<(), StoreError> {
        self.records.insert(record.id.clone(), record);
        self.flush()
    }

    fn flush(&self) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, &self.records)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;
        Ok(())
    }
}
