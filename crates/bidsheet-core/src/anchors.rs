//! Anchor Locator: finds bid-section, table-title and narrative-field
//! markers and returns them as one list ordered by `(page, top)`.

use regex::Regex;
use std::sync::LazyLock;

use crate::deadline::Deadline;
use crate::error::BidsheetError;
use crate::extraction::layout::{Layout, Position, TextMatch};
use crate::model::{Anchor, AnchorKind, NarrativeKind, TableKind};

/// Label given to the implicit section of a notice without bid markers.
pub const IMPLICIT_SECTION: &str = "N/A";

/// "標別" followed by a separator and one cyclic stem, a number or an
/// uppercase letter, optionally quoted.
static BID_SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"標別\s*[:：]?\s*[「『"“'（(]?\s*([甲乙丙丁戊己庚辛壬癸]|[0-9０-９]+|[A-Z])\s*[」』"”'）)]?"#,
    )
    .expect("bid section pattern")
});

static TABLE_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        "({}|{})",
        TableKind::Land.title(),
        TableKind::Building.title()
    ))
    .expect("table title pattern")
});

/// Narrative keyword at the start of a token, allowing an enumeration
/// prefix such as "三、" or "（二）".
static NARRATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let keywords = NarrativeKind::ALL
        .iter()
        .map(|k| k.keyword())
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(
        r"(?:^|\s)(?:[（(][一二三四五六七八九十0-9]{{1,2}}[)）]|[一二三四五六七八九十0-9]{{1,2}}[、.．])?\s*({keywords})"
    ))
    .expect("narrative pattern")
});

/// Run `re` over every row of the document.
fn search_rows(layout: &Layout, re: &Regex, deadline: &Deadline) -> Result<Vec<TextMatch>, BidsheetError> {
    let mut hits = Vec::new();
    for row in &layout.rows {
        deadline.check()?;
        hits.extend(row.search(re));
    }
    Ok(hits)
}

fn anchor_from(m: TextMatch, kind: AnchorKind, label: String) -> Anchor {
    Anchor {
        kind,
        page: m.page,
        top: m.top,
        bottom: m.bottom,
        left: m.left,
        label,
    }
}

fn clean_label(raw: &str) -> String {
    raw.trim_matches(|c: char| c.is_whitespace() || "「」『』\"“”'（）()".contains(c))
        .to_string()
}

/// Locate every anchor in the document, ordered by `(page, top)`.
///
/// Narrative keywords count only when their token starts left of
/// `narrative_max_left`; an indented occurrence is body text. Fails with
/// `NoAnchorsFound` when neither bid-section nor narrative markers exist.
/// Without bid-section markers a single implicit section anchor labeled
/// [`IMPLICIT_SECTION`] is placed at the start of the document.
pub fn locate_anchors(
    layout: &Layout,
    narrative_max_left: f32,
    deadline: &Deadline,
) -> Result<Vec<Anchor>, BidsheetError> {
    let mut anchors = Vec::new();

    for m in search_rows(layout, &BID_SECTION_RE, deadline)? {
        let label = clean_label(m.label.as_deref().unwrap_or_default());
        if label.is_empty() {
            continue;
        }
        anchors.push(anchor_from(m, AnchorKind::BidSection, label));
    }

    for m in search_rows(layout, &TABLE_TITLE_RE, deadline)? {
        let kind = if m.text.contains(TableKind::Land.title()) {
            TableKind::Land
        } else {
            TableKind::Building
        };
        anchors.push(anchor_from(m, AnchorKind::TableTitle(kind), kind.title().to_string()));
    }

    for m in search_rows(layout, &NARRATIVE_RE, deadline)? {
        if m.left >= narrative_max_left {
            tracing::trace!(page = m.page, left = m.left, text = %m.text, "indented narrative keyword ignored");
            continue;
        }
        let Some(kind) = m.label.as_deref().and_then(NarrativeKind::from_keyword) else {
            continue;
        };
        anchors.push(anchor_from(m, AnchorKind::NarrativeField(kind), kind.keyword().to_string()));
    }

    sort_anchors(&mut anchors);

    let has_bid = anchors.iter().any(Anchor::is_bid_section);
    let has_narrative = anchors
        .iter()
        .any(|a| matches!(a.kind, AnchorKind::NarrativeField(_)));
    if !has_bid && !has_narrative {
        return Err(BidsheetError::NoAnchorsFound);
    }
    if !has_bid {
        tracing::debug!("no bid-section markers; using one implicit section");
        anchors.insert(
            0,
            Anchor {
                kind: AnchorKind::BidSection,
                page: 0,
                top: 0.0,
                bottom: 0.0,
                left: 0.0,
                label: IMPLICIT_SECTION.to_string(),
            },
        );
    }

    tracing::debug!(count = anchors.len(), "anchors located");
    Ok(anchors)
}

/// Stable sort by `(page, top)`, then left edge within a row.
pub fn sort_anchors(anchors: &mut [Anchor]) {
    anchors.sort_by(|a, b| {
        Position::new(a.page, a.top)
            .cmp(&Position::new(b.page, b.top))
            .then(a.left.total_cmp(&b.left))
    });
}

/// Anchor text matching for plain lines, shared with the line strategy.
pub(crate) fn match_line(line: &str) -> Option<(AnchorKind, String)> {
    if let Some(caps) = BID_SECTION_RE.captures(line) {
        let label = clean_label(caps.get(1).map(|g| g.as_str()).unwrap_or_default());
        if !label.is_empty() {
            return Some((AnchorKind::BidSection, label));
        }
    }
    for kind in [TableKind::Land, TableKind::Building] {
        if line.contains(kind.title()) {
            return Some((AnchorKind::TableTitle(kind), kind.title().to_string()));
        }
    }
    let caps = NARRATIVE_RE.captures(line)?;
    let whole = caps.get(0)?;
    // Line-start only: plain text carries no x position to gate on.
    if !line[..whole.start()].trim().is_empty() {
        return None;
    }
    let kind = NarrativeKind::from_keyword(caps.get(1)?.as_str())?;
    Some((AnchorKind::NarrativeField(kind), kind.keyword().to_string()))
}
