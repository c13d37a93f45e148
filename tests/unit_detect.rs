mod support;

use sheetplan::config::EngineConfig;
use sheetplan::detect::{ColumnTypeDetector, DateColumn};
use sheetplan::executor::dates::format_serial;
use sheetplan::{Cell, ColumnType, Sheet};
use support::{header, num, text};

fn orders_sheet() -> Sheet {
    Sheet::from_parts(
        header(&["订单号", "订单提交时间", "金额", "备注", "Ship Date"]),
        vec![
            vec![text("SO-1"), num(45716.0), num(88_000.0), Cell::Empty, Cell::DateSerial(45720.0)],
            vec![text("SO-2"), num(45717.0), num(120_000.0), Cell::Empty, Cell::DateSerial(45721.0)],
            vec![text("SO-3"), num(45718.0), num(99_999.0), Cell::Empty, text("pending")],
        ],
    )
}

#[test]
fn detects_types_per_header() {
    let types = ColumnTypeDetector::default().detect_types(&orders_sheet());
    assert_eq!(types.get("订单号"), Some(&ColumnType::Text));
    assert_eq!(types.get("订单提交时间"), Some(&ColumnType::DateSerial));
    assert_eq!(types.get("金额"), Some(&ColumnType::Numeric));
    // 2 of 3 sampled cells is below the threshold
    assert_eq!(types.get("Ship Date"), Some(&ColumnType::Text));
    assert!(!types.contains_key("备注"));
}

#[test]
fn date_columns_need_keyword_and_serial_values() {
    let detector = ColumnTypeDetector::default();
    let columns = detector.detect_date_columns(&orders_sheet());
    assert_eq!(
        columns,
        vec![DateColumn {
            column: "订单提交时间".to_string(),
            index: 1,
        }]
    );

    let unnamed = Sheet::from_parts(header(&["编号"]), vec![vec![num(45716.0)]]);
    assert!(detector.detect_date_columns(&unnamed).is_empty());
    assert_eq!(
        detector.classify_column(&unnamed, 0),
        Some(ColumnType::DateSerial)
    );
}

#[test]
fn header_keywords_match_case_insensitively() {
    let detector = ColumnTypeDetector::default();
    assert!(detector.is_date_header("Order DATE"));
    assert!(detector.is_date_header("付款时间"));
    assert!(!detector.is_date_header("客户名称"));
}

#[test]
fn only_the_configured_sample_is_inspected() {
    let mut rows: Vec<Vec<Cell>> = (0..10).map(|i| vec![text(&format!("row {i}"))]).collect();
    rows.extend((0..40).map(|_| vec![num(45716.0)]));
    let sheet = Sheet::from_parts(header(&["下单日期"]), rows);

    let detector = ColumnTypeDetector::default();
    assert_eq!(detector.classify_column(&sheet, 0), Some(ColumnType::Text));
    assert!(detector.detect_date_columns(&sheet).is_empty());

    let wide = ColumnTypeDetector::from_config(&EngineConfig {
        sample_rows: 50,
        ..EngineConfig::default()
    });
    assert_eq!(wide.classify_column(&sheet, 0), Some(ColumnType::DateSerial));
    assert_eq!(wide.detect_date_columns(&sheet).len(), 1);
}

#[test]
fn threshold_is_strict() {
    let detector = ColumnTypeDetector::default();
    let build = |dates: usize, texts: usize| {
        let mut rows: Vec<Vec<Cell>> = (0..dates).map(|_| vec![num(45000.0)]).collect();
        rows.extend((0..texts).map(|_| vec![text("n/a")]));
        Sheet::from_parts(header(&["日期"]), rows)
    };
    assert_eq!(
        detector.classify_column(&build(7, 3), 0),
        Some(ColumnType::Text)
    );
    assert_eq!(
        detector.classify_column(&build(8, 2), 0),
        Some(ColumnType::DateSerial)
    );
}

#[test]
fn serials_format_from_the_1899_epoch() {
    assert_eq!(format_serial(45716.0).as_deref(), Some("2025-02-28"));
    assert_eq!(format_serial(45658.75).as_deref(), Some("2025-01-01"));
    assert_eq!(format_serial(-1.0), None);
}
