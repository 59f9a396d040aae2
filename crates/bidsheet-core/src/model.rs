use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::diagnostics::Diagnostic;
use crate::error::ErrorKind;
use crate::values::parse_amount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Land,
    Building,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Land => write!(f, "land"),
            TableKind::Building => write!(f, "building"),
        }
    }
}

impl TableKind {
    /// Title phrase that introduces this table in a notice.
    pub fn title(&self) -> &'static str {
        match self {
            TableKind::Land => "土地拍賣明細",
            TableKind::Building => "建物拍賣明細",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrativeKind {
    Usage,
    Delivery,
    Remarks,
}

impl NarrativeKind {
    pub const ALL: [NarrativeKind; 3] = [
        NarrativeKind::Usage,
        NarrativeKind::Delivery,
        NarrativeKind::Remarks,
    ];

    /// Field keyword as printed at the start of the block.
    pub fn keyword(&self) -> &'static str {
        match self {
            NarrativeKind::Usage => "使用情形",
            NarrativeKind::Delivery => "點交情形",
            NarrativeKind::Remarks => "備註",
        }
    }

    pub fn from_keyword(s: &str) -> Option<NarrativeKind> {
        NarrativeKind::ALL.into_iter().find(|k| k.keyword() == s)
    }
}

impl fmt::Display for NarrativeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NarrativeKind::Usage => write!(f, "usage"),
            NarrativeKind::Delivery => write!(f, "delivery"),
            NarrativeKind::Remarks => write!(f, "remarks"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "of")]
pub enum AnchorKind {
    BidSection,
    TableTitle(TableKind),
    NarrativeField(NarrativeKind),
}

/// A located marker used as a segmentation boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub kind: AnchorKind,
    pub page: usize,
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    /// Bid name for bid-section anchors, the matched keyword otherwise.
    pub label: String,
}

impl Anchor {
    pub fn is_bid_section(&self) -> bool {
        matches!(self.kind, AnchorKind::BidSection)
    }
}

/// One table row, keyed by semantic column.
///
/// Every column key of the table's definition is present; missing cells
/// hold an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub fields: BTreeMap<String, String>,
}

impl Record {
    pub fn with_keys<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        Record {
            fields: keys
                .into_iter()
                .map(|k| (k.to_string(), String::new()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> &str {
        self.fields.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.fields.insert(key.to_string(), value.into());
    }

    /// Append text to a column, separated from existing text by one space.
    pub fn append(&mut self, key: &str, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let slot = self.fields.entry(key.to_string()).or_default();
        if !slot.is_empty() {
            slot.push(' ');
        }
        slot.push_str(text);
    }

    /// Numeric value of a cell such as an area or price.
    pub fn decimal(&self, key: &str) -> Option<Decimal> {
        parse_amount(self.get(key))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BidSection {
    pub name: String,
    pub header_line: String,
    pub land_records: Vec<Record>,
    pub building_records: Vec<Record>,
    pub narrative_fields: BTreeMap<NarrativeKind, String>,
}

impl BidSection {
    pub fn new(name: impl Into<String>) -> Self {
        BidSection {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn records(&self, kind: TableKind) -> &[Record] {
        match kind {
            TableKind::Land => &self.land_records,
            TableKind::Building => &self.building_records,
        }
    }

    pub fn records_mut(&mut self, kind: TableKind) -> &mut Vec<Record> {
        match kind {
            TableKind::Land => &mut self.land_records,
            TableKind::Building => &mut self.building_records,
        }
    }

    pub fn narrative(&self, kind: NarrativeKind) -> Option<&str> {
        self.narrative_fields.get(&kind).map(String::as_str)
    }

    /// Store narrative text; repeated blocks for one key join with a space.
    pub fn push_narrative(&mut self, kind: NarrativeKind, text: &str) {
        if text.is_empty() {
            return;
        }
        let slot = self.narrative_fields.entry(kind).or_default();
        if !slot.is_empty() {
            slot.push(' ');
        }
        slot.push_str(text);
    }

    pub fn is_empty(&self) -> bool {
        self.land_records.is_empty()
            && self.building_records.is_empty()
            && self.narrative_fields.values().all(|v| v.trim().is_empty())
    }
}

/// Document-level outcome of a parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ParseResult {
    Ok {
        sections: Vec<BidSection>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        diagnostics: Vec<Diagnostic>,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
    /// No section survived finalization.
    Empty {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        diagnostics: Vec<Diagnostic>,
    },
}

impl ParseResult {
    pub fn sections(&self) -> &[BidSection] {
        match self {
            ParseResult::Ok { sections, .. } => sections,
            _ => &[],
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            ParseResult::Ok { diagnostics, .. } | ParseResult::Empty { diagnostics } => diagnostics,
            ParseResult::Error { .. } => &[],
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ParseResult::Error { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ParseResult::Error { .. })
    }
}
