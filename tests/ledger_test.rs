//! Ledger data entry against a real workbook package

mod fixtures;

use calamine::{open_workbook, Reader, Xlsx};
use fixtures::{read_part, write_ledger, ReportFixture, Workspace, LEDGER_SHEET, LEDGER_TABLE};
use qc_automation::ledger::{LedgerSheet, LedgerWriter, XlsxLedger};
use qc_automation::report::cell_at;
use qc_automation_common::{CellRef, CellValue};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn ledger_value(path: &Path, address: &str) -> CellValue {
    let mut workbook: Xlsx<_> = open_workbook(path).expect("open ledger");
    let range = workbook.worksheet_range(LEDGER_SHEET).expect("ledger sheet");
    cell_at(&range, CellRef::parse(address).expect("address"))
}

fn three_reports(ws: &Workspace) -> Vec<PathBuf> {
    vec![
        ws.pending_report(
            "a.xlsx",
            &ReportFixture {
                buyer: "Zen",
                consignment: "3",
                ..Default::default()
            },
        ),
        ws.pending_report(
            "b.xlsx",
            &ReportFixture {
                consignment: "12",
                ..Default::default()
            },
        ),
        ws.pending_report(
            "c.xlsx",
            &ReportFixture {
                consignment: "9",
                ..Default::default()
            },
        ),
    ]
}

/// Rows go after the last invoice, sorted, with fresh serial numbers
#[test]
fn test_rows_entered_in_sort_order() {
    let dir = tempdir().expect("Failed to create temp dir");
    let ws = Workspace::new(dir.path());
    let config = ws.config(0);
    write_ledger(&ws.ledger(), &["INV-1", "INV-2", "INV-3"]);
    let files = three_reports(&ws);

    let rows = LedgerWriter::new(&config).run(&files);
    assert_eq!(rows, 3);

    let ledger = ws.ledger();
    for old in ["C6", "C7", "C8"] {
        assert_eq!(ledger_value(&ledger, old), CellValue::Empty, "{} not cleared", old);
    }
    assert_eq!(ledger_value(&ledger, "F6"), CellValue::Text("INV-1".into()));

    assert_eq!(ledger_value(&ledger, "C9"), CellValue::Number(1.0));
    assert_eq!(ledger_value(&ledger, "F9"), CellValue::Number(9.0));
    assert_eq!(ledger_value(&ledger, "G9"), CellValue::Number(1000.0));
    assert_eq!(ledger_value(&ledger, "C10"), CellValue::Number(2.0));
    assert_eq!(ledger_value(&ledger, "F10"), CellValue::Number(12.0));
    assert_eq!(ledger_value(&ledger, "C11"), CellValue::Number(3.0));
    assert_eq!(ledger_value(&ledger, "F11"), CellValue::Number(3.0));
    assert_eq!(ledger_value(&ledger, "AK11"), CellValue::Number(0.0));
}

/// The table grows over the new rows and the backup is written
#[test]
fn test_table_extended_and_backup_created() {
    let dir = tempdir().expect("Failed to create temp dir");
    let ws = Workspace::new(dir.path());
    let config = ws.config(0);
    write_ledger(&ws.ledger(), &["INV-1", "INV-2", "INV-3"]);
    let files = three_reports(&ws);

    LedgerWriter::new(&config).run(&files);

    let ledger = XlsxLedger::open(&ws.ledger(), LEDGER_SHEET, LEDGER_TABLE).expect("reopen");
    assert_eq!(ledger.table_range().to_string(), "B5:AK11");
    assert!(ws.backup_dir().join("Main.xlsx").is_file());
}

/// Entry never starts above the minimum start row
#[test]
fn test_rows_start_at_min_start_row() {
    let dir = tempdir().expect("Failed to create temp dir");
    let ws = Workspace::new(dir.path());
    let config = ws.config(181);
    write_ledger(&ws.ledger(), &["INV-1"]);
    let files = three_reports(&ws);

    assert_eq!(LedgerWriter::new(&config).run(&files), 3);

    let ledger = ws.ledger();
    assert_eq!(ledger_value(&ledger, "C181"), CellValue::Number(1.0));
    assert_eq!(ledger_value(&ledger, "C183"), CellValue::Number(3.0));
    assert_eq!(ledger_value(&ledger, "C6"), CellValue::Empty);
}

/// Parts other than the ledger sheet and its table are copied verbatim
#[test]
fn test_other_parts_untouched() {
    let dir = tempdir().expect("Failed to create temp dir");
    let ws = Workspace::new(dir.path());
    let config = ws.config(0);
    write_ledger(&ws.ledger(), &["INV-1"]);
    let files = three_reports(&ws);

    let parts = ["xl/worksheets/sheet2.xml", "xl/styles.xml", "xl/workbook.xml"];
    let before: Vec<Vec<u8>> = parts.iter().map(|p| read_part(&ws.ledger(), p)).collect();

    LedgerWriter::new(&config).run(&files);

    for (part, original) in parts.iter().zip(before) {
        assert_eq!(read_part(&ws.ledger(), part), original, "{} changed", part);
    }
}

#[test]
fn test_missing_ledger_enters_nothing() {
    let dir = tempdir().expect("Failed to create temp dir");
    let ws = Workspace::new(dir.path());
    let config = ws.config(0);
    let files = three_reports(&ws);

    assert_eq!(LedgerWriter::new(&config).run(&files), 0);
    assert!(!ws.backup_dir().exists());
}

#[test]
fn test_empty_file_list() {
    let dir = tempdir().expect("Failed to create temp dir");
    let ws = Workspace::new(dir.path());
    let config = ws.config(0);
    write_ledger(&ws.ledger(), &[]);

    assert_eq!(LedgerWriter::new(&config).run(&[]), 0);
}
