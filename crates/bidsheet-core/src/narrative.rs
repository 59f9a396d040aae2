//! Narrative Extractor: the free text between a narrative-field anchor and
//! the next boundary.

use crate::anchors::match_line;
use crate::boilerplate::{is_page_furniture, is_signature_start};
use crate::deadline::Deadline;
use crate::error::BidsheetError;
use crate::extraction::layout::{Layout, Position};
use crate::model::{Anchor, AnchorKind, NarrativeKind};

/// Extract the block opened by `anchor` and ending before `until`.
///
/// The text after the keyword on the anchor's own row is the first line.
/// Cleaning drops page numbers and running headers, stops at the signature
/// block, and stops at a line opening with a different narrative keyword.
/// That last rule is a heuristic: legitimate text starting with a sibling
/// keyword is cut as well.
pub fn extract(
    layout: &Layout,
    anchor: &Anchor,
    kind: NarrativeKind,
    until: Option<Position>,
    deadline: &Deadline,
) -> Result<String, BidsheetError> {
    let start = Position::new(anchor.page, anchor.top);

    let mut raw = Vec::new();
    if let Some(first) = layout.row_at(start).and_then(|row| inline_remainder(&row.text(), kind)) {
        raw.push(first);
    }
    for row in layout.rows_between(start, until) {
        deadline.check()?;
        raw.push(row.text());
    }

    Ok(clean_block(&raw, kind))
}

/// Text following the keyword on the anchor's line.
pub(crate) fn inline_remainder(text: &str, kind: NarrativeKind) -> Option<String> {
    let keyword = kind.keyword();
    let at = text.find(keyword)? + keyword.len();
    let rest = text[at..].trim_start_matches(|c: char| c == ':' || c == '：' || c.is_whitespace());

    // Another field sharing the row ends this one.
    let cut = NarrativeKind::ALL
        .iter()
        .filter(|k| **k != kind)
        .filter_map(|k| rest.find(&format!(" {}", k.keyword())))
        .min()
        .unwrap_or(rest.len());
    let rest = rest[..cut].trim();
    (!rest.is_empty()).then(|| rest.to_string())
}

/// Apply the line-level cleaning rules and join with newlines.
pub fn clean_block(lines: &[String], kind: NarrativeKind) -> String {
    let mut kept = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() || is_page_furniture(line) {
            continue;
        }
        if is_signature_start(line) {
            tracing::trace!(%kind, line, "signature block reached");
            break;
        }
        if let Some((AnchorKind::NarrativeField(other), _)) = match_line(line) {
            if other != kind {
                tracing::trace!(%kind, %other, "sibling field bled into block; truncated");
                break;
            }
        }
        kept.push(line);
    }
    kept.join("\n")
}
