//! Visual rows and document positions built from positioned tokens.
//!
//! A row is the set of tokens on one page whose `top..bottom` bands
//! overlap, ordered left to right. Rows are the unit every later stage
//! works in: anchors are matched against row text, tables read rows as
//! records, narrative blocks are runs of rows.

use regex::Regex;
use std::cmp::Ordering;

use super::{Page, PositionedToken};
use crate::deadline::Deadline;
use crate::error::BidsheetError;

/// A `(page, y)` point in reading order.
#[derive(Debug, Clone, Copy)]
pub struct Position {
    pub page: usize,
    pub y: f32,
}

impl Position {
    pub fn new(page: usize, y: f32) -> Self {
        Position { page, y }
    }

    pub fn start() -> Self {
        Position { page: 0, y: 0.0 }
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Position {}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.page
            .cmp(&other.page)
            .then_with(|| self.y.total_cmp(&other.y))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub page: usize,
    pub top: f32,
    pub bottom: f32,
    pub tokens: Vec<PositionedToken>,
}

/// A pattern hit inside a row.
#[derive(Debug, Clone, PartialEq)]
pub struct TextMatch {
    pub page: usize,
    pub top: f32,
    pub bottom: f32,
    /// Left edge of the token in which the match starts.
    pub left: f32,
    pub text: String,
    /// First capture group, when the pattern has one and it participated.
    pub label: Option<String>,
    /// Byte offset just past the match within the row text.
    pub end: usize,
}

impl Row {
    pub fn position(&self) -> Position {
        Position::new(self.page, self.top)
    }

    pub fn left(&self) -> f32 {
        self.tokens.first().map(|t| t.left).unwrap_or(0.0)
    }

    /// Row text with tokens joined by a single space.
    pub fn text(&self) -> String {
        self.tokens
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn overlaps(&self, token: &PositionedToken, tolerance: f32) -> bool {
        token.page == self.page
            && token.top < self.bottom - tolerance
            && token.bottom > self.top + tolerance
    }

    /// Scan the row text for `re`, reporting each hit with its geometry.
    pub fn search(&self, re: &Regex) -> Vec<TextMatch> {
        let text = self.text();
        let mut starts = Vec::with_capacity(self.tokens.len());
        let mut offset = 0;
        for t in &self.tokens {
            starts.push(offset);
            offset += t.text.len() + 1;
        }

        re.captures_iter(&text)
            .filter_map(|caps| {
                let m = caps.get(0)?;
                let leading_ws = m.as_str().len() - m.as_str().trim_start().len();
                let at = m.start() + leading_ws;
                let token_idx = starts.iter().rposition(|&s| s <= at).unwrap_or(0);
                Some(TextMatch {
                    page: self.page,
                    top: self.top,
                    bottom: self.bottom,
                    left: self.tokens.get(token_idx).map(|t| t.left).unwrap_or(0.0),
                    text: m.as_str().trim().to_string(),
                    label: caps.get(1).map(|g| g.as_str().to_string()),
                    end: m.end(),
                })
            })
            .collect()
    }
}

/// Group tokens (already ordered by page then top) into visual rows.
pub fn group_rows(tokens: &[PositionedToken], tolerance: f32) -> Vec<Row> {
    let mut rows: Vec<Row> = Vec::new();

    for token in tokens {
        if token.text.trim().is_empty() {
            continue;
        }
        match rows.last_mut() {
            Some(row) if row.overlaps(token, tolerance) => {
                row.top = row.top.min(token.top);
                row.bottom = row.bottom.max(token.bottom);
                row.tokens.push(token.clone());
            }
            _ => rows.push(Row {
                page: token.page,
                top: token.top,
                bottom: token.bottom,
                tokens: vec![token.clone()],
            }),
        }
    }

    for row in &mut rows {
        row.tokens.sort_by(|a, b| a.left.total_cmp(&b.left));
    }
    rows
}

/// All rows of a document in reading order.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub rows: Vec<Row>,
}

impl Layout {
    pub fn build(pages: &[Page], tolerance: f32, deadline: &Deadline) -> Result<Self, BidsheetError> {
        let mut rows = Vec::new();
        for page in pages {
            deadline.check()?;
            rows.extend(group_rows(&page.tokens, tolerance));
        }
        Ok(Layout { rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows strictly after `from` and strictly before `to` (end of document if `None`).
    pub fn rows_between(&self, from: Position, to: Option<Position>) -> impl Iterator<Item = &Row> {
        self.rows
            .iter()
            .filter(move |r| r.position() > from && to.map_or(true, |end| r.position() < end))
    }

    /// The row located exactly at `at`, if any.
    pub fn row_at(&self, at: Position) -> Option<&Row> {
        self.rows.iter().find(|r| r.position() == at)
    }

    /// Plain text of every row on pages `first..=last`.
    pub fn page_window_text(&self, first: usize, last: usize) -> String {
        self.rows
            .iter()
            .filter(|r| r.page >= first && r.page <= last)
            .map(Row::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Page {
    /// The search primitive: every match of `re` on this page, row by row.
    pub fn search(&self, re: &Regex, tolerance: f32) -> Vec<TextMatch> {
        group_rows(&self.tokens, tolerance)
            .iter()
            .flat_map(|row| row.search(re))
            .collect()
    }
}
