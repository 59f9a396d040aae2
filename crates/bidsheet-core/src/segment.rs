//! Section Segmenter: folds the ordered anchor list into bid-section spans.

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::extraction::layout::Position;
use crate::model::Anchor;

/// The slice of a document owned by one bid section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionSpan {
    pub name: String,
    pub start: Position,
    /// Top of the next bid-section anchor; `None` runs to end of document.
    pub end: Option<Position>,
    /// Table and narrative anchors owned by this section, in order.
    pub anchors: Vec<Anchor>,
}

impl SectionSpan {
    fn open(bid: &Anchor) -> Self {
        SectionSpan {
            name: bid.label.clone(),
            start: Position::new(bid.page, bid.top),
            end: None,
            anchors: Vec::new(),
        }
    }

    /// Where the content following `self.anchors[i]` stops: the next owned
    /// anchor, else the section end.
    pub fn boundary_after(&self, i: usize) -> Option<Position> {
        self.anchors
            .get(i + 1)
            .map(|a| Position::new(a.page, a.top))
            .or(self.end)
    }

    /// First and last page index covered by this section.
    pub fn page_window(&self, last_page: usize) -> (usize, usize) {
        let last = self.end.map(|e| e.page).unwrap_or(last_page);
        (self.start.page, last.max(self.start.page))
    }
}

#[derive(Debug, Default)]
struct Fold {
    done: Vec<SectionSpan>,
    open: Option<SectionSpan>,
    orphans: Vec<Diagnostic>,
}

/// Partition anchors into sections, one per bid-section anchor.
///
/// Anchors before the first bid-section anchor belong to no section and
/// are reported as `orphan_anchor` diagnostics.
pub fn segment(anchors: &[Anchor]) -> (Vec<SectionSpan>, Vec<Diagnostic>) {
    let folded = anchors.iter().fold(Fold::default(), |mut acc, anchor| {
        if anchor.is_bid_section() {
            let next = SectionSpan::open(anchor);
            if let Some(mut prev) = acc.open.replace(next) {
                prev.end = Some(Position::new(anchor.page, anchor.top));
                acc.done.push(prev);
            }
        } else if let Some(open) = acc.open.as_mut() {
            open.anchors.push(anchor.clone());
        } else {
            acc.orphans.push(
                Diagnostic::new(
                    DiagnosticKind::OrphanAnchor,
                    format!("'{}' appears before the first bid section", anchor.label),
                )
                .on_page(anchor.page),
            );
        }
        acc
    });

    let Fold {
        mut done,
        open,
        orphans,
    } = folded;
    done.extend(open);
    tracing::debug!(sections = done.len(), "document segmented");
    (done, orphans)
}
