//! Column boundaries inferred from header token positions.

use std::collections::HashSet;

use super::schema::{ColumnDef, SERIAL};
use crate::extraction::layout::Row;
use crate::model::Record;

/// Slack allowed when a cell starts slightly left of its header.
pub const COLUMN_SNAP: f32 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub key: &'static str,
    pub start_x: f32,
    pub end_x: f32,
}

/// Columns of one table instance, ordered left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLayout {
    columns: Vec<ColumnSpec>,
}

impl ColumnLayout {
    /// Resolve each definition against the header row.
    ///
    /// Returns `None` unless the serial column is found.
    pub fn infer(header: &Row, defs: &[ColumnDef]) -> Option<Self> {
        let mut claimed = HashSet::new();
        let mut columns = Vec::new();

        for def in defs {
            let hit = header
                .tokens
                .iter()
                .enumerate()
                .find(|(i, t)| !claimed.contains(i) && def.matches(&t.text));
            if let Some((i, token)) = hit {
                claimed.insert(i);
                columns.push(ColumnSpec {
                    key: def.key,
                    start_x: token.left,
                    end_x: f32::INFINITY,
                });
            }
        }

        if !columns.iter().any(|c| c.key == SERIAL) {
            return None;
        }

        columns.sort_by(|a, b| a.start_x.total_cmp(&b.start_x));
        let starts: Vec<f32> = columns.iter().map(|c| c.start_x).collect();
        for (col, next) in columns.iter_mut().zip(starts.iter().skip(1)) {
            col.end_x = *next;
        }
        Some(ColumnLayout { columns })
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Column whose `[start_x, end_x)` holds `left`; the leftmost column
    /// also takes anything further left.
    pub fn column_for(&self, left: f32) -> Option<&ColumnSpec> {
        let idx = self
            .columns
            .partition_point(|c| c.start_x <= left + COLUMN_SNAP);
        self.columns.get(idx.saturating_sub(1))
    }

    /// Map a row's tokens into a record keyed by `keys`.
    pub fn assign<'k>(&self, row: &Row, keys: impl IntoIterator<Item = &'k str>) -> Record {
        let mut record = Record::with_keys(keys);
        for token in &row.tokens {
            if let Some(col) = self.column_for(token.left) {
                record.append(col.key, &token.text);
            }
        }
        record
    }
}
