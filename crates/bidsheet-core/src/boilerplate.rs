use regex::RegexSet;
use std::sync::LazyLock;

/// Page numbers and running headers/footers repeated on every page.
static PAGE_FURNITURE: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"^第\s*[0-9０-９]+\s*頁",
        r"^共\s*[0-9０-９]+\s*頁",
        r"^[-－]?\s*[0-9０-９]+\s*[-－]?$",
        r"^[0-9]+\s*/\s*[0-9]+$",
        r"(?i)^page\s+[0-9]+(\s+of\s+[0-9]+)?$",
        r"^\S*法院\S*執行處\s*公告\s*$",
        // case number repeated alone at the top of each page
        r"^(案號\s*[:：]?\s*)?[0-9０-９]{2,3}\s*年度\s*\p{Han}{1,6}?\s*字\s*第\s*[0-9０-９]+\s*號$",
    ])
    .expect("page furniture patterns")
});

/// Markers that open the clerk/officer signature block at the end of a
/// notice; nothing after them belongs to a field.
static SIGNATURE_MARKERS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"書記官",
        r"司法事務官",
        r"^中\s*華\s*民\s*國\s*[0-9０-９]+\s*年\s*[0-9０-９]+\s*月",
    ])
    .expect("signature marker patterns")
});

pub fn is_page_furniture(line: &str) -> bool {
    PAGE_FURNITURE.is_match(line.trim())
}

pub fn is_signature_start(line: &str) -> bool {
    SIGNATURE_MARKERS.is_match(line.trim())
}
