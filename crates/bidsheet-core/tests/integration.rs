//! Integration tests for the parse_pdf() end-to-end pipeline.
//!
//! Uses a MockExtractor that returns pre-built pages without invoking
//! pdftotext, so these tests run without poppler-utils.

use std::time::Duration;

use bidsheet_core::deadline::Deadline;
use bidsheet_core::diagnostics::DiagnosticKind;
use bidsheet_core::error::{BidsheetError, ErrorKind};
use bidsheet_core::extraction::layout::Position;
use bidsheet_core::extraction::{Page, PdfExtractor, PositionedToken};
use bidsheet_core::model::{NarrativeKind, ParseResult};
use bidsheet_core::{locate, parse_pages, parse_pdf, ParseOptions};
use rust_decimal_macros::dec;

struct MockExtractor {
    pages: Vec<Page>,
}

impl PdfExtractor for MockExtractor {
    fn extract_pages(&self, _pdf_bytes: &[u8], _deadline: &Deadline) -> Result<Vec<Page>, BidsheetError> {
        Ok(self.pages.clone())
    }

    fn backend_name(&self) -> &str {
        "mock"
    }
}

struct FailingExtractor;

impl PdfExtractor for FailingExtractor {
    fn extract_pages(&self, _pdf_bytes: &[u8], _deadline: &Deadline) -> Result<Vec<Page>, BidsheetError> {
        Err(BidsheetError::UnexpectedDecoderFault("bad font descriptor".into()))
    }

    fn backend_name(&self) -> &str {
        "failing"
    }
}

/// Fails the way an out-of-process backend does once its budget is spent.
struct DeadlineBoundExtractor;

impl PdfExtractor for DeadlineBoundExtractor {
    fn extract_pages(&self, _pdf_bytes: &[u8], deadline: &Deadline) -> Result<Vec<Page>, BidsheetError> {
        deadline.check()?;
        Ok(end_to_end_pages())
    }

    fn backend_name(&self) -> &str {
        "deadline-bound"
    }
}

/// A page built from `(top, left, text)` tokens, each 12pt tall.
fn page(index: usize, tokens: &[(f32, f32, &str)]) -> Page {
    let tokens = tokens
        .iter()
        .map(|&(top, left, text)| PositionedToken::new(index, top, top + 12.0, left, text))
        .collect();
    Page::new(index, String::new(), tokens, 595.0, 842.0)
}

fn end_to_end_pages() -> Vec<Page> {
    vec![page(
        0,
        &[
            (30.0, 200.0, "113年度司執字第12345號"),
            (60.0, 60.0, "標別：甲"),
            (100.0, 60.0, "土地拍賣明細"),
            (120.0, 60.0, "編號"),
            (120.0, 120.0, "地號"),
            (120.0, 250.0, "面積"),
            (120.0, 350.0, "價格"),
            (140.0, 60.0, "1"),
            (140.0, 120.0, "A-123"),
            (140.0, 250.0, "50"),
            (140.0, 350.0, "1000000"),
            (160.0, 130.0, "備註：道路用地"),
            (200.0, 60.0, "使用情形：空地"),
        ],
    )]
}

// ---------------------------------------------------------------------------
// End-to-end: one bid, one land table with a wrapped row, one usage block
// ---------------------------------------------------------------------------
#[test]
fn single_bid_land_table_and_usage() {
    let extractor = MockExtractor {
        pages: end_to_end_pages(),
    };

    let result = parse_pdf(&[], &extractor, &ParseOptions::default());

    let sections = result.sections();
    assert_eq!(sections.len(), 1, "{result:?}");
    let s = &sections[0];
    assert_eq!(s.name, "甲");
    assert_eq!(s.header_line, "113年度司執字第12345號 owner: unknown");
    assert!(s.building_records.is_empty());

    assert_eq!(s.land_records.len(), 1);
    let r = &s.land_records[0];
    assert_eq!(r.get("parcel"), "A-123");
    assert_eq!(r.get("area"), "50");
    assert_eq!(r.get("price"), "1000000");
    assert_eq!(r.get("remarks"), "備註：道路用地");
    assert_eq!(r.decimal("price"), Some(dec!(1000000)));
    assert!(r.fields.contains_key("rights"));

    assert_eq!(s.narrative(NarrativeKind::Usage), Some("空地"));
    assert_eq!(s.narrative_fields.len(), 1);
    assert!(result.diagnostics().is_empty());
}

#[test]
fn result_serializes_with_status_tag() {
    let result = parse_pages(&end_to_end_pages(), &ParseOptions::default());
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["sections"][0]["name"], "甲");
    assert_eq!(json["sections"][0]["land_records"][0]["parcel"], "A-123");
    assert_eq!(json["sections"][0]["narrative_fields"]["usage"], "空地");
}

// ---------------------------------------------------------------------------
// Idempotence
// ---------------------------------------------------------------------------
#[test]
fn parsing_twice_is_byte_identical() {
    let pages = end_to_end_pages();
    let first = serde_json::to_string(&parse_pages(&pages, &ParseOptions::default())).unwrap();
    let second = serde_json::to_string(&parse_pages(&pages, &ParseOptions::default())).unwrap();
    assert_eq!(first, second);
}

// ---------------------------------------------------------------------------
// Anchor ordering across pages
// ---------------------------------------------------------------------------
#[test]
fn anchor_list_is_sorted_by_page_then_top() {
    let pages = vec![
        page(
            0,
            &[
                (500.0, 60.0, "標別：乙"),
                (80.0, 60.0, "使用情形：自住"),
                (40.0, 60.0, "標別：甲"),
                (300.0, 60.0, "建物拍賣明細"),
            ],
        ),
        page(1, &[(20.0, 60.0, "備註：無"), (10.0, 60.0, "點交情形：點交")]),
    ];

    let anchors = locate(&pages, &ParseOptions::default()).unwrap();

    assert_eq!(anchors.len(), 6);
    let positions: Vec<Position> = anchors.iter().map(|a| Position::new(a.page, a.top)).collect();
    assert!(positions.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(anchors[0].label, "甲");
    assert_eq!(anchors[3].label, "乙");
}

// ---------------------------------------------------------------------------
// Zero bid-section anchors: one implicit "N/A" section
// ---------------------------------------------------------------------------
#[test]
fn no_bid_markers_yields_one_implicit_section() {
    let pages = vec![page(
        0,
        &[(100.0, 60.0, "使用情形：空地"), (140.0, 60.0, "點交情形：點交")],
    )];

    let result = parse_pages(&pages, &ParseOptions::default());

    let sections = result.sections();
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].name, "N/A");
    assert_eq!(sections[0].narrative(NarrativeKind::Usage), Some("空地"));
    assert_eq!(sections[0].narrative(NarrativeKind::Delivery), Some("點交"));
}

// ---------------------------------------------------------------------------
// Continuation merge with a single separating space
// ---------------------------------------------------------------------------
#[test]
fn continuation_rows_append_to_previous_record() {
    let pages = vec![page(
        0,
        &[
            (40.0, 60.0, "標別：甲"),
            (80.0, 60.0, "建物拍賣明細"),
            (100.0, 60.0, "編號"),
            (100.0, 110.0, "建號"),
            (100.0, 200.0, "門牌"),
            (100.0, 400.0, "備考"),
            (120.0, 60.0, "1"),
            (120.0, 110.0, "456"),
            (120.0, 200.0, "中山路1號"),
            (140.0, 210.0, "含增建部分"),
            (160.0, 210.0, "未辦保存登記"),
        ],
    )];

    let result = parse_pages(&pages, &ParseOptions::default());

    let s = &result.sections()[0];
    assert_eq!(s.building_records.len(), 1);
    let r = &s.building_records[0];
    assert_eq!(r.get("building_number"), "456");
    assert_eq!(r.get("address"), "中山路1號");
    assert_eq!(r.get("remarks"), "含增建部分 未辦保存登記");
}

// ---------------------------------------------------------------------------
// Table without an identifier column: no records, section kept
// ---------------------------------------------------------------------------
#[test]
fn table_without_identifier_column_contributes_nothing() {
    let pages = vec![page(
        0,
        &[
            (40.0, 60.0, "標別：甲"),
            (80.0, 60.0, "土地拍賣明細"),
            (100.0, 120.0, "地號"),
            (100.0, 250.0, "面積"),
            (120.0, 120.0, "A-1"),
            (120.0, 250.0, "50"),
            (200.0, 60.0, "點交情形：不點交"),
        ],
    )];

    let result = parse_pages(&pages, &ParseOptions::default());

    assert!(!result.is_error());
    let s = &result.sections()[0];
    assert!(s.land_records.is_empty());
    assert_eq!(s.narrative(NarrativeKind::Delivery), Some("不點交"));
    let kinds: Vec<DiagnosticKind> = result.diagnostics().iter().map(|d| d.kind).collect();
    assert_eq!(kinds, vec![DiagnosticKind::MalformedTable]);
}

#[test]
fn unit_caption_naming_a_column_does_not_hide_the_header() {
    let pages = vec![page(
        0,
        &[
            (40.0, 60.0, "標別：甲"),
            (80.0, 60.0, "土地拍賣明細"),
            (95.0, 300.0, "面積單位：平方公尺"),
            (115.0, 60.0, "編號"),
            (115.0, 120.0, "地號"),
            (115.0, 250.0, "面積"),
            (115.0, 350.0, "價格"),
            (135.0, 60.0, "1"),
            (135.0, 120.0, "A-123"),
            (135.0, 250.0, "50"),
            (135.0, 350.0, "1000000"),
        ],
    )];

    let result = parse_pages(&pages, &ParseOptions::default());

    let s = &result.sections()[0];
    assert_eq!(s.land_records.len(), 1, "{result:?}");
    assert_eq!(s.land_records[0].get("parcel"), "A-123");
    assert_eq!(s.land_records[0].decimal("area"), Some(dec!(50)));
    assert!(result.diagnostics().is_empty());
}

// ---------------------------------------------------------------------------
// Back-to-back tables keep their records apart
// ---------------------------------------------------------------------------
#[test]
fn land_then_building_table_in_one_section() {
    let pages = vec![page(
        0,
        &[
            (40.0, 60.0, "標別：甲"),
            (80.0, 60.0, "土地拍賣明細"),
            (100.0, 60.0, "編號"),
            (100.0, 120.0, "地號"),
            (100.0, 250.0, "面積"),
            (100.0, 350.0, "價格"),
            (120.0, 60.0, "1"),
            (120.0, 120.0, "A-123"),
            (120.0, 250.0, "50"),
            (120.0, 350.0, "1000000"),
            (160.0, 60.0, "建物拍賣明細"),
            (180.0, 60.0, "編號"),
            (180.0, 110.0, "建號"),
            (180.0, 200.0, "門牌"),
            (200.0, 60.0, "1"),
            (200.0, 110.0, "456"),
            (200.0, 200.0, "中山路1號"),
        ],
    )];

    let result = parse_pages(&pages, &ParseOptions::default());

    let s = &result.sections()[0];
    assert_eq!(s.land_records.len(), 1, "{result:?}");
    assert_eq!(s.building_records.len(), 1);
    assert_eq!(s.land_records[0].get("parcel"), "A-123");
    assert_eq!(s.land_records[0].get("remarks"), "");
    assert!(!s.land_records[0].fields.contains_key("building_number"));
    assert_eq!(s.building_records[0].get("building_number"), "456");
    assert_eq!(s.building_records[0].get("address"), "中山路1號");
    assert!(!s.building_records[0].fields.contains_key("parcel"));
}

// ---------------------------------------------------------------------------
// Narrative truncation at a sibling keyword
// ---------------------------------------------------------------------------
#[test]
fn usage_block_stops_at_remarks_line() {
    let pages = vec![page(
        0,
        &[
            (40.0, 60.0, "標別：丙"),
            (100.0, 60.0, "使用情形："),
            (120.0, 120.0, "現為停車場使用"),
            (140.0, 120.0, "備註：本標為道路用地"),
            (160.0, 120.0, "請投標人自行查明"),
        ],
    )];

    let result = parse_pages(&pages, &ParseOptions::default());

    let usage = result.sections()[0].narrative(NarrativeKind::Usage).unwrap();
    assert_eq!(usage, "現為停車場使用");
    assert!(!usage.contains("備註"));
    assert!(!usage.contains("自行查明"));
}

// ---------------------------------------------------------------------------
// Sections are independent and ordered
// ---------------------------------------------------------------------------
#[test]
fn multiple_bids_across_pages() {
    let pages = vec![
        page(
            0,
            &[
                (40.0, 60.0, "標別：甲"),
                (80.0, 60.0, "使用情形：空地"),
                (700.0, 60.0, "標別：乙"),
                (720.0, 60.0, "備註："),
                (740.0, 72.0, "拍定後不點交，"),
                (800.0, 280.0, "第 1 頁"),
            ],
        ),
        page(
            1,
            &[(40.0, 72.0, "買受人應自行處理。"), (300.0, 60.0, "書記官 林小華")],
        ),
    ];

    let result = parse_pages(&pages, &ParseOptions::default());

    let sections = result.sections();
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0].name, "甲");
    assert_eq!(sections[0].narrative(NarrativeKind::Remarks), None);
    assert_eq!(sections[1].name, "乙");
    assert_eq!(
        sections[1].narrative(NarrativeKind::Remarks),
        Some("拍定後不點交，\n買受人應自行處理。")
    );
}

#[test]
fn running_case_number_header_skipped_across_page_break() {
    let pages = vec![
        page(
            0,
            &[
                (20.0, 200.0, "113年度司執字第500號"),
                (40.0, 60.0, "標別：甲"),
                (720.0, 60.0, "備註："),
                (740.0, 72.0, "拍定後不點交，"),
            ],
        ),
        page(
            1,
            &[
                (20.0, 200.0, "113年度司執字第500號"),
                (40.0, 72.0, "買受人應自行處理。"),
            ],
        ),
    ];

    let result = parse_pages(&pages, &ParseOptions::default());

    let s = &result.sections()[0];
    assert_eq!(s.narrative(NarrativeKind::Remarks), Some("拍定後不點交，\n買受人應自行處理。"));
    assert_eq!(s.header_line, "113年度司執字第500號 owner: unknown");
}

#[test]
fn empty_sections_are_dropped() {
    let pages = vec![page(
        0,
        &[(40.0, 60.0, "標別：甲"), (300.0, 60.0, "標別：乙"), (340.0, 60.0, "備註：無")],
    )];

    let result = parse_pages(&pages, &ParseOptions::default());

    let names: Vec<&str> = result.sections().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["乙"]);
}

// ---------------------------------------------------------------------------
// Document-level outcomes
// ---------------------------------------------------------------------------
#[test]
fn only_empty_sections_is_empty_outcome() {
    let pages = vec![page(0, &[(40.0, 60.0, "標別：甲")])];
    let result = parse_pages(&pages, &ParseOptions::default());
    assert!(matches!(result, ParseResult::Empty { .. }), "{result:?}");
}

#[test]
fn no_markers_is_no_anchors_found() {
    let pages = vec![page(0, &[(40.0, 60.0, "本院定期拍賣不動產")])];
    let result = parse_pages(&pages, &ParseOptions::default());
    assert_eq!(result.error_kind(), Some(ErrorKind::NoAnchorsFound));
    assert!(result.sections().is_empty());
}

#[test]
fn text_layer_without_markers_is_no_anchors_found() {
    let pages = vec![Page::new(0, "本院定期拍賣不動產\n詳如附表".into(), vec![], 595.0, 842.0)];
    let result = parse_pages(&pages, &ParseOptions::default());
    assert_eq!(result.error_kind(), Some(ErrorKind::NoAnchorsFound), "{result:?}");
}

#[test]
fn image_only_document_is_scanned() {
    let pages = vec![Page::new(0, "   ".into(), vec![], 595.0, 842.0)];
    let result = parse_pages(&pages, &ParseOptions::default());
    assert_eq!(result.error_kind(), Some(ErrorKind::ScannedDocument));
}

#[test]
fn expired_deadline_is_timeout_not_parse_failure() {
    let options = ParseOptions::default().with_deadline(Deadline::after(Duration::ZERO));
    let result = parse_pages(&end_to_end_pages(), &options);
    assert_eq!(result.error_kind(), Some(ErrorKind::ExtractionTimeout));
}

#[test]
fn deadline_reaches_the_extractor() {
    let options = ParseOptions::default().with_deadline(Deadline::after(Duration::ZERO));
    let result = parse_pdf(b"%PDF-1.4", &DeadlineBoundExtractor, &options);
    assert_eq!(result.error_kind(), Some(ErrorKind::ExtractionTimeout));

    let result = parse_pdf(b"%PDF-1.4", &DeadlineBoundExtractor, &ParseOptions::default());
    assert_eq!(result.sections().len(), 1);
}

#[test]
fn decoder_fault_is_reported_as_error() {
    let result = parse_pdf(b"%PDF-1.4", &FailingExtractor, &ParseOptions::default());
    assert_eq!(result.error_kind(), Some(ErrorKind::UnexpectedDecoderFault));
    match result {
        ParseResult::Error { message, .. } => assert!(message.contains("bad font descriptor")),
        other => panic!("expected error, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Text layer only: line strategy fallback
// ---------------------------------------------------------------------------
#[test]
fn text_only_pages_fall_back_to_line_strategy() {
    let pages = vec![Page::new(
        0,
        "標別：甲\n使用情形：出租他人\n點交情形：不點交".into(),
        vec![],
        595.0,
        842.0,
    )];

    let result = parse_pages(&pages, &ParseOptions::default());

    let s = &result.sections()[0];
    assert_eq!(s.narrative(NarrativeKind::Usage), Some("出租他人"));
    assert_eq!(s.narrative(NarrativeKind::Delivery), Some("不點交"));
    assert_eq!(result.diagnostics()[0].kind, DiagnosticKind::StrategyFallback);
}
