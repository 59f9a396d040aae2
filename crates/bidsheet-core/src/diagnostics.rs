use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A table header without a resolvable identifier column.
    MalformedTable,
    /// A continuation row with no preceding record to merge into.
    OrphanContinuation,
    /// A table or narrative anchor located before the first bid section.
    OrphanAnchor,
    /// The primary strategy produced nothing and a fallback was used.
    StrategyFallback,
}

/// A local failure absorbed during extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            section: None,
            page: None,
            message: message.into(),
        }
    }

    pub fn in_section(mut self, name: &str) -> Self {
        self.section = Some(name.to_string());
        self
    }

    pub fn on_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }
}
