//! Report extraction tests
//!
//! Reads fixture workbooks written with rust_xlsxwriter.

mod fixtures;

use fixtures::{ReportFixture, Workspace};
use qc_automation::error::QcError;
use qc_automation::report::ReportReader;
use qc_automation_common::CellValue;
use rust_xlsxwriter::Workbook;
use tempfile::tempdir;

/// Organisation fields, sort key and ledger entry of one report
#[test]
fn test_read_report_fields_and_entry() {
    let dir = tempdir().expect("Failed to create temp dir");
    let ws = Workspace::new(dir.path());
    let config = ws.config(181);
    let path = ws.pending_report(
        "r1.xlsx",
        &ReportFixture {
            page_cells: vec![
                ("A23", "Slub"),
                ("V23", "2"),
                ("W23", "3"),
                ("A24", " hole "),
                ("AO24", "4"),
                ("A25", "Mystery"),
                ("V25", "1.5"),
            ],
            hidden_page: true,
            ..Default::default()
        },
    );

    let report = ReportReader::new(&config).read(&path).expect("read report");

    assert_eq!(report.field("buyer"), "Acme");
    assert_eq!(report.field("supplier"), "Mill One");
    assert_eq!(report.raw("consignment"), CellValue::Number(12.0));
    assert_eq!(report.sort_key.consignment, 12);
    assert_eq!(report.sort_key.rolls, 20);

    let entry = report.entry.as_ref().expect("ledger entry");
    assert_eq!(entry.get("F"), Some(&CellValue::Number(12.0)));
    assert_eq!(entry.get("G"), Some(&CellValue::Number(1000.0)));
    // hidden page points are not counted
    assert_eq!(entry.get("X"), Some(&CellValue::Number(5.0)));
    assert_eq!(entry.get("Y"), Some(&CellValue::Number(4.0)));
    assert_eq!(entry.get("AK"), Some(&CellValue::Number(1.5)));
}

/// Critical shading is counted per roll on visible page sheets only
#[test]
fn test_read_report_shading_figures() {
    let dir = tempdir().expect("Failed to create temp dir");
    let ws = Workspace::new(dir.path());
    let config = ws.config(181);
    let path = ws.pending_report(
        "r1.xlsx",
        &ReportFixture {
            check_roll: "2",
            page_cells: vec![("B15", "3/4"), ("C16", "4/5"), ("F15", "5"), ("G17", "4.5")],
            hidden_page: true,
            ..Default::default()
        },
    );

    let report = ReportReader::new(&config).read(&path).expect("read report");
    let figures = report.figures.as_ref().expect("figures");

    assert_eq!(figures.check_roll, 2);
    assert_eq!(figures.critical_shade_rolls, 1);
    assert_eq!(figures.order_width, 58.0);
    assert_eq!(figures.avg_point, 5.0);
}

/// A report without the organisation sheet cannot be read
#[test]
fn test_read_report_missing_sheet() {
    let dir = tempdir().expect("Failed to create temp dir");
    let ws = Workspace::new(dir.path());
    let config = ws.config(181);

    let path = dir.path().join("other.xlsx");
    let mut workbook = Workbook::new();
    workbook
        .add_worksheet()
        .set_name("Other")
        .expect("sheet name");
    workbook.save(&path).expect("save");

    let result = ReportReader::new(&config).read(&path);
    assert!(matches!(result, Err(QcError::SheetNotFound { .. })));
}

/// A file that is not a workbook is an error, not a panic
#[test]
fn test_read_report_corrupt_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let ws = Workspace::new(dir.path());
    let config = ws.config(181);

    let path = dir.path().join("broken.xlsx");
    std::fs::write(&path, b"not a workbook").expect("write");

    assert!(ReportReader::new(&config).read(&path).is_err());
}
