//! Extraction strategies, tried in order until one yields sections.
//!
//! [`LayoutStrategy`] is the full engine over positioned tokens. When a
//! document has a text layer but no word boxes, [`LineStrategy`] scans the
//! page text line by line and recovers narrative fields only.

use crate::anchors::{locate_anchors, match_line, IMPLICIT_SECTION};
use crate::deadline::Deadline;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::{BidsheetError, ErrorKind};
use crate::extraction::layout::{Layout, Position, Row};
use crate::extraction::Page;
use crate::finalize::{finalize, find_case_number};
use crate::model::{AnchorKind, BidSection, NarrativeKind};
use crate::narrative::{self, clean_block, inline_remainder};
use crate::segment::{segment, SectionSpan};
use crate::tables;
use crate::ParseOptions;

/// Sections a strategy produced plus what it absorbed along the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub sections: Vec<BidSection>,
    pub diagnostics: Vec<Diagnostic>,
}

pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Build finalized sections from `pages`. `None` means the input this
    /// strategy reads (word boxes, page text) is absent, so it never ran;
    /// errors are document-level.
    fn extract(&self, pages: &[Page], options: &ParseOptions) -> Result<Option<Extraction>, BidsheetError>;
}

pub fn default_strategies() -> Vec<Box<dyn ExtractionStrategy>> {
    vec![Box::new(LayoutStrategy), Box::new(LineStrategy)]
}

/// Try each strategy in order; the first non-empty result wins.
///
/// An error is returned when no earlier strategy ran, or when it is a
/// timeout. Otherwise a failing fallback is skipped. A strategy with no
/// input does not count as having run.
pub fn run(
    strategies: &[Box<dyn ExtractionStrategy>],
    pages: &[Page],
    options: &ParseOptions,
) -> Result<Extraction, BidsheetError> {
    let mut skipped: Vec<&str> = Vec::new();
    let mut absorbed: Option<Vec<Diagnostic>> = None;

    for strategy in strategies {
        match strategy.extract(pages, options) {
            Ok(None) => {
                tracing::debug!(strategy = strategy.name(), "strategy has no input");
            }
            Ok(Some(mut out)) if !out.sections.is_empty() => {
                tracing::debug!(
                    strategy = strategy.name(),
                    sections = out.sections.len(),
                    "strategy selected"
                );
                if !skipped.is_empty() {
                    out.diagnostics.insert(
                        0,
                        Diagnostic::new(
                            DiagnosticKind::StrategyFallback,
                            format!("{} produced no sections; used {}", skipped.join(", "), strategy.name()),
                        ),
                    );
                }
                return Ok(out);
            }
            Ok(Some(out)) => {
                tracing::debug!(strategy = strategy.name(), "strategy produced no sections");
                absorbed.get_or_insert_with(Vec::new).extend(out.diagnostics);
            }
            Err(e) if absorbed.is_none() || e.kind() == ErrorKind::ExtractionTimeout => return Err(e),
            Err(e) => {
                tracing::debug!(strategy = strategy.name(), error = %e, "fallback strategy failed");
            }
        }
        skipped.push(strategy.name());
    }

    Ok(Extraction {
        sections: Vec::new(),
        diagnostics: absorbed.unwrap_or_default(),
    })
}

/// Anchors, segmentation, column-inferred tables and narrative blocks over
/// visual rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutStrategy;

impl ExtractionStrategy for LayoutStrategy {
    fn name(&self) -> &'static str {
        "layout"
    }

    fn extract(&self, pages: &[Page], options: &ParseOptions) -> Result<Option<Extraction>, BidsheetError> {
        let deadline = &options.deadline;
        let layout = Layout::build(pages, options.row_tolerance, deadline)?;
        if layout.is_empty() {
            return Ok(None);
        }

        let anchors = locate_anchors(&layout, options.narrative_max_left, deadline)?;
        let (spans, mut diagnostics) = segment(&anchors);
        let last_page = last_page(pages);
        let doc_case = find_case_number(&layout.page_window_text(0, last_page));

        let mut sections = Vec::new();
        for span in &spans {
            let section = build_section(&layout, span, &mut diagnostics, deadline)?;
            let (first, last) = span.page_window(last_page);
            if let Some(section) = finalize(section, &layout.page_window_text(first, last), doc_case.as_deref()) {
                sections.push(section);
            }
        }

        Ok(Some(Extraction { sections, diagnostics }))
    }
}

fn build_section(
    layout: &Layout,
    span: &SectionSpan,
    diagnostics: &mut Vec<Diagnostic>,
    deadline: &Deadline,
) -> Result<BidSection, BidsheetError> {
    let mut section = BidSection::new(span.name.as_str());

    for (i, anchor) in span.anchors.iter().enumerate() {
        deadline.check()?;
        let until = span.boundary_after(i);

        match anchor.kind {
            AnchorKind::TableTitle(kind) => {
                let rows: Vec<&Row> = layout
                    .rows_between(Position::new(anchor.page, anchor.top), until)
                    .collect();
                match tables::reconstruct(kind, anchor.page, &rows, deadline) {
                    Ok(outcome) => {
                        section.records_mut(kind).extend(outcome.records);
                        diagnostics.extend(outcome.diagnostics.into_iter().map(|d| d.in_section(&span.name)));
                    }
                    Err(BidsheetError::MalformedTable { kind, page, reason }) => {
                        tracing::warn!(section = %span.name, %kind, page, %reason, "table rejected");
                        diagnostics.push(
                            Diagnostic::new(DiagnosticKind::MalformedTable, format!("{kind} table: {reason}"))
                                .in_section(&span.name)
                                .on_page(page),
                        );
                    }
                    Err(e) => return Err(e),
                }
            }
            AnchorKind::NarrativeField(kind) => {
                let text = narrative::extract(layout, anchor, kind, until, deadline)?;
                section.push_narrative(kind, &text);
            }
            AnchorKind::BidSection => {}
        }
    }

    Ok(section)
}

fn last_page(pages: &[Page]) -> usize {
    pages.iter().map(|p| p.index).max().unwrap_or(0)
}

/// Line-start keyword scan over the page-text layer.
///
/// Tables are not reconstructed: plain lines carry no column geometry. A
/// table title still closes the narrative block above it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineStrategy;

#[derive(Debug)]
struct LineSection {
    name: String,
    first_page: usize,
    last_page: usize,
    blocks: Vec<(NarrativeKind, Vec<String>)>,
    open: bool,
}

impl LineSection {
    fn new(name: &str, page: usize) -> Self {
        LineSection {
            name: name.to_string(),
            first_page: page,
            last_page: page,
            blocks: Vec::new(),
            open: false,
        }
    }

    fn start_block(&mut self, kind: NarrativeKind, first: Option<String>) {
        self.blocks.push((kind, first.into_iter().collect()));
        self.open = true;
    }

    fn push_line(&mut self, line: &str) {
        if !self.open {
            return;
        }
        if let Some((_, lines)) = self.blocks.last_mut() {
            lines.push(line.to_string());
        }
    }
}

impl ExtractionStrategy for LineStrategy {
    fn name(&self) -> &'static str {
        "line"
    }

    fn extract(&self, pages: &[Page], options: &ParseOptions) -> Result<Option<Extraction>, BidsheetError> {
        let mut lines = Vec::new();
        for page in pages {
            options.deadline.check()?;
            for line in page.text.lines() {
                lines.push((page.index, line, match_line(line)));
            }
        }
        if lines.iter().all(|(_, l, _)| l.trim().is_empty()) {
            return Ok(None);
        }

        let has_bid = lines
            .iter()
            .any(|(_, _, m)| matches!(m, Some((AnchorKind::BidSection, _))));
        let has_narrative = lines
            .iter()
            .any(|(_, _, m)| matches!(m, Some((AnchorKind::NarrativeField(_), _))));
        if !has_bid && !has_narrative {
            return Err(BidsheetError::NoAnchorsFound);
        }

        let last_page = last_page(pages);
        let mut diagnostics = Vec::new();
        let mut open: Vec<LineSection> = Vec::new();
        if !has_bid {
            open.push(LineSection::new(IMPLICIT_SECTION, 0));
        }

        for (page, line, matched) in &lines {
            match matched {
                Some((AnchorKind::BidSection, name)) => {
                    if let Some(prev) = open.last_mut() {
                        prev.last_page = *page;
                    }
                    open.push(LineSection::new(name, *page));
                }
                Some((AnchorKind::NarrativeField(kind), _)) => match open.last_mut() {
                    Some(section) => section.start_block(*kind, inline_remainder(line, *kind)),
                    None => diagnostics.push(
                        Diagnostic::new(
                            DiagnosticKind::OrphanAnchor,
                            format!("'{}' appears before the first bid section", kind.keyword()),
                        )
                        .on_page(*page),
                    ),
                },
                Some((AnchorKind::TableTitle(_), _)) => {
                    if let Some(section) = open.last_mut() {
                        section.open = false;
                    }
                }
                None => {
                    if let Some(section) = open.last_mut() {
                        section.push_line(line);
                    }
                }
            }
        }
        if let Some(tail) = open.last_mut() {
            tail.last_page = last_page;
        }

        let window = |first: usize, last: usize| {
            pages
                .iter()
                .filter(|p| p.index >= first && p.index <= last)
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        };
        let doc_case = find_case_number(&window(0, last_page));

        let mut sections = Vec::new();
        for ls in open {
            options.deadline.check()?;
            let mut section = BidSection::new(ls.name.as_str());
            for (kind, raw) in &ls.blocks {
                section.push_narrative(*kind, &clean_block(raw, *kind));
            }
            if let Some(section) = finalize(section, &window(ls.first_page, ls.last_page), doc_case.as_deref()) {
                sections.push(section);
            }
        }

        Ok(Some(Extraction { sections, diagnostics }))
    }
}
