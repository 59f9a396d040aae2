//! Table Reconstructor: turns the rows under a table-title anchor into
//! land or building records.
//!
//! Column boundaries come from where the header words sit on the page, not
//! from delimiters, so tables with missing or reordered columns still map
//! cells to the right keys. A row without a numeric serial is treated as a
//! wrapped line of the record above it.

pub mod columns;
pub mod schema;

use crate::boilerplate::is_page_furniture;
use crate::deadline::Deadline;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::BidsheetError;
use crate::extraction::layout::Row;
use crate::model::{Record, TableKind};
use columns::ColumnLayout;
use schema::{ColumnDef, REMARKS, SERIAL};

/// Leading rows (unit captions and the like) skipped while looking for a
/// header row.
const HEADER_SEARCH_ROWS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableOutcome {
    pub records: Vec<Record>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Rebuild one table from the rows between its title anchor and the next
/// anchor.
///
/// Fails with `MalformedTable` when the header lacks the serial column; the
/// caller keeps the section and leaves this table empty.
pub fn reconstruct(
    kind: TableKind,
    title_page: usize,
    rows: &[&Row],
    deadline: &Deadline,
) -> Result<TableOutcome, BidsheetError> {
    let defs = schema::columns(kind);
    let rows: Vec<&Row> = rows
        .iter()
        .copied()
        .filter(|r| !is_page_furniture(&r.text()))
        .collect();

    // A caption such as "面積單位：平方公尺" names a column but is not the
    // header; keep looking below it.
    let mut rejected: Option<&Row> = None;
    let mut found = None;
    for (i, row) in rows.iter().take(HEADER_SEARCH_ROWS).enumerate() {
        if !is_header_like(row, defs) {
            continue;
        }
        match ColumnLayout::infer(row, defs) {
            Some(layout) => {
                found = Some((i, *row, layout));
                break;
            }
            None => {
                rejected.get_or_insert(*row);
            }
        }
    }
    let (header_idx, header, layout) = match (found, rejected) {
        (Some(found), _) => found,
        (None, Some(row)) => {
            return Err(BidsheetError::MalformedTable {
                kind,
                page: row.page,
                reason: format!("header '{}' has no serial column", row.text()),
            })
        }
        (None, None) => {
            return Err(BidsheetError::MalformedTable {
                kind,
                page: title_page,
                reason: "no header row under table title".into(),
            })
        }
    };
    tracing::debug!(
        %kind,
        page = header.page,
        columns = layout.columns().len(),
        "table header resolved"
    );

    let mut outcome = TableOutcome::default();
    for row in &rows[header_idx + 1..] {
        deadline.check()?;

        if is_repeated_header(row, defs) {
            tracing::trace!(page = row.page, "repeated header row skipped");
            continue;
        }

        let record = layout.assign(row, schema::keys(kind));
        if is_serial(record.get(SERIAL)) {
            outcome.records.push(record);
            continue;
        }

        let text = row.text();
        match outcome.records.last_mut() {
            Some(prev) => {
                tracing::trace!(page = row.page, text = %text, "continuation row merged");
                prev.append(REMARKS, &text);
            }
            None => {
                tracing::warn!(page = row.page, text = %text, "continuation row with no record above it");
                outcome.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::OrphanContinuation,
                        format!("{kind} table row '{text}' has no preceding record"),
                    )
                    .on_page(row.page),
                );
            }
        }
    }

    outcome.records.retain(|r| !is_noise(r));
    Ok(outcome)
}

fn is_serial(cell: &str) -> bool {
    let cell = cell.trim();
    !cell.is_empty() && cell.chars().all(|c| c.is_ascii_digit() || ('０'..='９').contains(&c))
}

fn is_header_like(row: &Row, defs: &[ColumnDef]) -> bool {
    row.tokens.iter().any(|t| defs.iter().any(|d| d.matches(&t.text)))
}

/// A header printed again at the top of a continuation page.
fn is_repeated_header(row: &Row, defs: &[ColumnDef]) -> bool {
    let hits = defs
        .iter()
        .filter(|d| row.tokens.iter().any(|t| d.matches(&t.text)))
        .count();
    let has_serial = defs
        .iter()
        .filter(|d| d.key == SERIAL)
        .any(|d| row.tokens.iter().any(|t| d.matches(&t.text)));
    has_serial && hits >= 2
}

fn is_noise(record: &Record) -> bool {
    record
        .fields
        .iter()
        .filter(|(k, _)| k.as_str() != SERIAL)
        .all(|(_, v)| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::layout::group_rows;
    use crate::extraction::PositionedToken;

    fn line(top: f32, cells: &[(f32, &str)]) -> Vec<PositionedToken> {
        cells
            .iter()
            .map(|&(left, text)| PositionedToken::new(0, top, top + 10.0, left, text))
            .collect()
    }

    fn rows(lines: Vec<Vec<PositionedToken>>) -> Vec<Row> {
        group_rows(&lines.concat(), 1.0)
    }

    const HEADER: &[(f32, &str)] = &[(60.0, "編號"), (120.0, "地號"), (250.0, "面積"), (350.0, "價格")];

    #[test]
    fn test_continuation_row_merges_into_remarks() {
        let rs = rows(vec![
            line(100.0, HEADER),
            line(120.0, &[(60.0, "1"), (120.0, "A-123"), (250.0, "50"), (350.0, "1000000")]),
            line(140.0, &[(130.0, "備註：道路用地")]),
        ]);
        let refs: Vec<&Row> = rs.iter().collect();
        let out = reconstruct(TableKind::Land, 0, &refs, &Deadline::unbounded()).unwrap();
        assert_eq!(out.records.len(), 1);
        let r = &out.records[0];
        assert_eq!(r.get("parcel"), "A-123");
        assert_eq!(r.get("area"), "50");
        assert_eq!(r.get("price"), "1000000");
        assert_eq!(r.get("remarks"), "備註：道路用地");
    }

    #[test]
    fn test_second_continuation_separated_by_space() {
        let rs = rows(vec![
            line(100.0, HEADER),
            line(120.0, &[(60.0, "1"), (120.0, "A-1")]),
            line(140.0, &[(130.0, "第一行")]),
            line(160.0, &[(130.0, "第二行")]),
            line(180.0, &[(60.0, "2"), (120.0, "A-2")]),
        ]);
        let refs: Vec<&Row> = rs.iter().collect();
        let out = reconstruct(TableKind::Land, 0, &refs, &Deadline::unbounded()).unwrap();
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].get("remarks"), "第一行 第二行");
        assert_eq!(out.records[1].get("parcel"), "A-2");
    }

    #[test]
    fn test_header_without_serial_is_malformed() {
        let rs = rows(vec![
            line(100.0, &[(120.0, "地號"), (250.0, "面積")]),
            line(120.0, &[(120.0, "A-1"), (250.0, "50")]),
        ]);
        let refs: Vec<&Row> = rs.iter().collect();
        let err = reconstruct(TableKind::Land, 0, &refs, &Deadline::unbounded()).unwrap_err();
        assert!(matches!(err, BidsheetError::MalformedTable { kind: TableKind::Land, .. }));
    }

    #[test]
    fn test_noise_row_rejected() {
        let rs = rows(vec![line(100.0, HEADER), line(120.0, &[(60.0, "7")])]);
        let refs: Vec<&Row> = rs.iter().collect();
        let out = reconstruct(TableKind::Land, 0, &refs, &Deadline::unbounded()).unwrap();
        assert!(out.records.is_empty());
    }

    #[test]
    fn test_orphan_continuation_is_reported() {
        let rs = rows(vec![line(100.0, HEADER), line(120.0, &[(130.0, "說明文字")])]);
        let refs: Vec<&Row> = rs.iter().collect();
        let out = reconstruct(TableKind::Land, 0, &refs, &Deadline::unbounded()).unwrap();
        assert!(out.records.is_empty());
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].kind, DiagnosticKind::OrphanContinuation);
    }

    #[test]
    fn test_unit_caption_before_header_and_repeated_header_skipped() {
        let rs = rows(vec![
            line(90.0, &[(400.0, "單位：新臺幣元")]),
            line(100.0, HEADER),
            line(120.0, &[(60.0, "1"), (120.0, "A-1"), (350.0, "100")]),
            line(140.0, &[(60.0, "第 1 頁")]),
            line(160.0, HEADER),
            line(180.0, &[(60.0, "2"), (120.0, "A-2"), (350.0, "200")]),
        ]);
        let refs: Vec<&Row> = rs.iter().collect();
        let out = reconstruct(TableKind::Land, 0, &refs, &Deadline::unbounded()).unwrap();
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].get("remarks"), "");
        assert_eq!(out.records[1].get("price"), "200");
    }

    #[test]
    fn test_caption_naming_a_column_is_not_the_header() {
        let rs = rows(vec![
            line(90.0, &[(300.0, "面積單位：平方公尺")]),
            line(100.0, HEADER),
            line(120.0, &[(60.0, "1"), (120.0, "A-123"), (250.0, "50"), (350.0, "1000000")]),
        ]);
        let refs: Vec<&Row> = rs.iter().collect();
        let out = reconstruct(TableKind::Land, 0, &refs, &Deadline::unbounded()).unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].get("parcel"), "A-123");
        assert_eq!(out.records[0].get("area"), "50");
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_full_width_serial_opens_record() {
        assert!(is_serial("１２"));
        assert!(is_serial("3"));
        assert!(!is_serial("3a"));
        assert!(!is_serial(""));
    }
}
