use bidsheet_core::diagnostics::Diagnostic;
use bidsheet_core::model::{Anchor, AnchorKind, BidSection, ParseResult, Record, TableKind};
use bidsheet_core::tables::schema::{self, SERIAL};

pub fn format_result(result: &ParseResult) -> String {
    let mut out = String::new();
    match result {
        ParseResult::Ok {
            sections,
            diagnostics,
        } => {
            for (i, section) in sections.iter().enumerate() {
                if i > 0 {
                    out.push('\n');
                }
                format_section(&mut out, section);
            }
            format_diagnostics(&mut out, diagnostics);
        }
        ParseResult::Empty { diagnostics } => {
            out.push_str("No extractable content.\n");
            format_diagnostics(&mut out, diagnostics);
        }
        ParseResult::Error { kind, message } => {
            out.push_str(&format!("Error ({kind}): {message}\n"));
        }
    }
    out
}

fn format_section(out: &mut String, section: &BidSection) {
    out.push_str(&format!("=== 標別 {} ===\n", section.name));
    if !section.header_line.is_empty() {
        out.push_str(&format!("  {}\n", section.header_line));
    }

    for kind in [TableKind::Land, TableKind::Building] {
        let records = section.records(kind);
        if records.is_empty() {
            continue;
        }
        out.push_str(&format!("\n  {} records ({}):\n", kind, records.len()));
        for record in records {
            out.push_str(&format!("    #{}  {}\n", record.get(SERIAL), format_record(record, kind)));
        }
        if let Some(total) = records.iter().filter_map(|r| r.decimal("area")).reduce(|a, b| a + b) {
            out.push_str(&format!("    total area: {total}\n"));
        }
        if let Some(total) = records.iter().filter_map(|r| r.decimal("price")).reduce(|a, b| a + b) {
            out.push_str(&format!("    total price: {total}\n"));
        }
    }

    for (kind, text) in &section.narrative_fields {
        out.push_str(&format!("\n  {kind}:\n"));
        for line in text.lines() {
            out.push_str(&format!("    {line}\n"));
        }
    }
}

/// Non-empty cells in column order, serial excluded.
fn format_record(record: &Record, kind: TableKind) -> String {
    schema::keys(kind)
        .filter(|k| *k != SERIAL)
        .filter(|k| !record.get(k).is_empty())
        .map(|k| format!("{k}: {}", record.get(k)))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn format_diagnostics(out: &mut String, diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    out.push_str(&format!("\n{} diagnostic(s):\n", diagnostics.len()));
    for d in diagnostics {
        let section = d.section.as_deref().map(|s| format!(" [{s}]")).unwrap_or_default();
        let page = d.page.map(|p| format!(" p{p}")).unwrap_or_default();
        out.push_str(&format!("  {:?}{section}{page}: {}\n", d.kind, d.message));
    }
}

fn anchor_kind_name(kind: &AnchorKind) -> String {
    match kind {
        AnchorKind::BidSection => "bid_section".to_string(),
        AnchorKind::TableTitle(t) => format!("table_title({t})"),
        AnchorKind::NarrativeField(n) => format!("narrative({n})"),
    }
}

pub fn format_anchors(anchors: &[Anchor]) -> String {
    let mut out = String::new();
    for a in anchors {
        out.push_str(&format!(
            "p{:<3} y={:>7.1} x={:>6.1}  {:<20} {}\n",
            a.page,
            a.top,
            a.left,
            anchor_kind_name(&a.kind),
            a.label
        ));
    }
    out
}
