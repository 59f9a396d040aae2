use rust_decimal::Decimal;
use std::str::FromStr;

const UNIT_SUFFIXES: &[&str] = &["平方公尺", "㎡", "m2", "M2", "元", "整"];
const CURRENCY_PREFIXES: &[&str] = &["新台幣", "新臺幣", "NT$", "$"];

/// Parse a numeric table cell (area, price) into a Decimal.
///
/// Handles formats like:
/// - "1000000" -> 1000000
/// - "1,000,000元" -> 1000000
/// - "新臺幣１２３，４５６元" -> 123456 (full-width digits and comma)
/// - "50.25平方公尺" -> 50.25
/// - "" or "-" -> None
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let mut s = normalize_width(s.trim());

    for prefix in CURRENCY_PREFIXES {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest.trim_start().to_string();
        }
    }
    for suffix in UNIT_SUFFIXES {
        if let Some(rest) = s.strip_suffix(suffix) {
            s = rest.trim_end().to_string();
        }
    }

    let cleaned: String = s.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

/// Map full-width digits and punctuation to their ASCII forms.
fn normalize_width(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '０'..='９' => char::from(b'0' + (c as u32 - '０' as u32) as u8),
            '，' => ',',
            '．' => '.',
            '／' => '/',
            _ => c,
        })
        .collect()
}
