//! Workbook fixtures shared by the integration tests
#![allow(dead_code)]

use qc_automation::config::Config;
use qc_automation_common::CellRef;
use rust_xlsxwriter::{Table, Workbook, Worksheet};
use serde_json::json;
use std::io::Read;
use std::path::{Path, PathBuf};

pub const LEDGER_SHEET: &str = "Data Analysis report";
pub const LEDGER_TABLE: &str = "Table13";

fn at(address: &str) -> (u32, u16) {
    let cell = CellRef::parse(address).expect("bad fixture address");
    (cell.row - 1, (cell.col - 1) as u16)
}

/// Writes a number when the text parses as one, otherwise a string. Empty
/// text leaves the cell blank.
pub fn put(sheet: &mut Worksheet, address: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    let (row, col) = at(address);
    match value.parse::<f64>() {
        Ok(n) => sheet.write_number(row, col, n).expect("write number"),
        Err(_) => sheet.write_string(row, col, value).expect("write string"),
    };
}

/// Contents of one inspection report.
#[derive(Debug, Clone)]
pub struct ReportFixture {
    pub buyer: &'static str,
    pub supplier: &'static str,
    pub consignment: &'static str,
    pub result: &'static str,
    pub rolls: &'static str,
    pub style: &'static str,
    pub color: &'static str,
    pub fabric_code: &'static str,
    pub date: &'static str,
    pub comment: &'static str,
    pub order_width: &'static str,
    pub actual_width: &'static str,
    pub ticked_yards: &'static str,
    pub total_short_excess: &'static str,
    pub avg_point: &'static str,
    pub check_roll: &'static str,
    /// (address, value) cells of the visible page sheet
    pub page_cells: Vec<(&'static str, &'static str)>,
    /// Adds a hidden page sheet full of defect points
    pub hidden_page: bool,
}

impl Default for ReportFixture {
    fn default() -> Self {
        Self {
            buyer: "Acme",
            supplier: "Mill One",
            consignment: "12",
            result: "Pass",
            rolls: "20",
            style: "S1",
            color: "Red",
            fabric_code: "FC1",
            date: "2024-05-01",
            comment: "",
            order_width: "58",
            actual_width: "58",
            ticked_yards: "1000",
            total_short_excess: "0",
            avg_point: "5",
            check_roll: "2",
            page_cells: Vec::new(),
            hidden_page: false,
        }
    }
}

impl ReportFixture {
    pub fn write(&self, path: &Path) {
        let mut workbook = Workbook::new();

        let summary = workbook.add_worksheet();
        summary.set_name("Summary").expect("sheet name");
        for (address, value) in [
            ("C2", self.buyer),
            ("C3", self.supplier),
            ("C4", self.consignment),
            ("C5", self.result),
            ("C6", self.rolls),
            ("C7", self.style),
            ("C8", self.color),
            ("C9", self.fabric_code),
            ("C10", self.date),
            ("C11", self.comment),
            ("C12", self.order_width),
            ("C13", self.actual_width),
            ("C14", self.ticked_yards),
            ("C15", self.total_short_excess),
            ("C16", self.avg_point),
            ("C17", self.check_roll),
        ] {
            put(summary, address, value);
        }

        let page = workbook.add_worksheet();
        page.set_name("Page 1").expect("sheet name");
        for (address, value) in &self.page_cells {
            put(page, address, value);
        }

        if self.hidden_page {
            let hidden = workbook.add_worksheet();
            hidden.set_name("Page 2").expect("sheet name");
            hidden.set_hidden(true);
            put(hidden, "A23", "Slub");
            put(hidden, "V23", "100");
            put(hidden, "B15", "1");
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("fixture folder");
        }
        workbook.save(path).expect("save report fixture");
    }
}

/// Ledger with `Table13` at B5:AK10 and invoices filled from F6 down, plus a
/// second sheet that must survive saves untouched.
pub fn write_ledger(path: &Path, invoices: &[&str]) {
    let mut workbook = Workbook::new();

    let sheet = workbook.add_worksheet();
    sheet.set_name(LEDGER_SHEET).expect("sheet name");
    let table = Table::new().set_name(LEDGER_TABLE);
    sheet.add_table(4, 1, 9, 36, &table).expect("add table");
    for (i, invoice) in invoices.iter().enumerate() {
        let row = 6 + i;
        put(sheet, &format!("C{}", row), &(i + 1).to_string());
        put(sheet, &format!("F{}", row), invoice);
    }

    let notes = workbook.add_worksheet();
    notes.set_name("Notes").expect("sheet name");
    put(notes, "A1", "Keep me");

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("fixture folder");
    }
    workbook.save(path).expect("save ledger fixture");
}

/// Raw bytes of one part of an xlsx package.
pub fn read_part(path: &Path, name: &str) -> Vec<u8> {
    let file = std::fs::File::open(path).expect("open package");
    let mut archive = zip::ZipArchive::new(file).expect("read package");
    let mut entry = archive.by_name(name).expect("part present");
    let mut data = Vec::new();
    entry.read_to_end(&mut data).expect("read part");
    data
}

pub struct Workspace {
    pub root: PathBuf,
}

impl Workspace {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn ledger(&self) -> PathBuf {
        self.root.join("ledger").join("Main.xlsx")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.root.join("ledger").join("backup")
    }

    pub fn pending(&self) -> PathBuf {
        self.root.join("work").join("Pending Reports")
    }

    pub fn ongoing(&self) -> PathBuf {
        self.root.join("work").join("Ongoing Work")
    }

    pub fn review(&self) -> PathBuf {
        self.root.join("work").join("Manual Review")
    }

    pub fn errors(&self) -> PathBuf {
        self.root.join("work").join("Error Reports")
    }

    pub fn drafts(&self) -> PathBuf {
        self.root.join("drafts")
    }

    pub fn config_json(&self, min_start_row: u32) -> serde_json::Value {
        json!({
            "paths": {
                "main_workbook": self.ledger(),
                "main_workbook_backup": self.backup_dir(),
                "pending_reports": self.pending(),
                "ongoing_work": self.ongoing(),
                "manual_review": self.review(),
                "email_drafts": self.drafts()
            },
            "mappings_data_entry": {
                "summary_mapping": { "C4": "F", "C14": "G" },
                "defect_mapping": { "Slub": "X", "Hole": "Y" },
                "target_table_name": LEDGER_TABLE,
                "min_start_row": min_start_row
            },
            "cell_map_organization": {
                "sheet_name": "Summary",
                "buyer": "C2",
                "supplier": "C3",
                "consignment": "C4",
                "result": "C5",
                "rolls": "C6",
                "style": "C7",
                "color": "C8",
                "fabric_code": "C9",
                "date": "C10",
                "comment": "C11",
                "order_width": "C12",
                "actual_width": "C13",
                "ticked_yards": "C14",
                "total_short_excess": "C15",
                "avg_point": "C16",
                "check_roll": "C17"
            },
            "email_settings": {
                "primary_recipient": "qa-lead@example.com",
                "secondary_recipient": "qa-team@example.com"
            },
            "email_filter_rules": {
                "pass_report_triggers": {
                    "width_shortage_tolerance_inch": 0.5,
                    "length_shortage_percentage": 0.5,
                    "avg_point_threshold": 10,
                    "shading_percentage_threshold": 15
                }
            }
        })
    }

    pub fn config(&self, min_start_row: u32) -> Config {
        Config::from_json(&self.config_json(min_start_row).to_string()).expect("fixture config")
    }

    /// Writes a report into the pending folder.
    pub fn pending_report(&self, name: &str, report: &ReportFixture) -> PathBuf {
        let path = self.pending().join(name);
        report.write(&path);
        path
    }
}
