use regex::Regex;
use std::sync::LazyLock;

use crate::model::BidSection;

pub const OWNER_PLACEHOLDER: &str = "unknown";

/// Court case number: year, division stem, sequence number, e.g.
/// "113年度司執字第12345號".
static CASE_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9０-９]{2,3})\s*年度\s*(\p{Han}{1,6}?)\s*字\s*第\s*([0-9０-９]+)\s*號")
        .expect("case number pattern")
});

/// First case number in `text`, with internal spacing removed.
pub fn find_case_number(text: &str) -> Option<String> {
    let caps = CASE_NUMBER_RE.captures(text)?;
    Some(format!("{}年度{}字第{}號", &caps[1], &caps[2], &caps[3]))
}

/// Collapse whitespace runs to one space.
pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a built section and decide whether it survives.
///
/// `window_text` is the text of the pages the section spans; `doc_case` is
/// the document-wide case number used when the window has none. Returns
/// `None` for a section with no records and no narrative text.
pub fn finalize(mut section: BidSection, window_text: &str, doc_case: Option<&str>) -> Option<BidSection> {
    for record in section.land_records.iter_mut().chain(section.building_records.iter_mut()) {
        for value in record.fields.values_mut() {
            *value = collapse_ws(value);
        }
    }

    for value in section.narrative_fields.values_mut() {
        *value = value
            .lines()
            .map(collapse_ws)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
    }
    section.narrative_fields.retain(|_, v| !v.is_empty());

    if section.is_empty() {
        tracing::debug!(section = %section.name, "empty section dropped");
        return None;
    }

    let case = find_case_number(window_text).or_else(|| doc_case.map(str::to_string));
    section.header_line = case
        .map(|c| format!("{c} owner: {OWNER_PLACEHOLDER}"))
        .unwrap_or_default();

    Some(section)
}
