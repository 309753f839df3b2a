//! Data entry into the master ledger workbook
//!
//! The ledger is reached through [`LedgerSheet`], a narrow view of one sheet
//! and its named table. [`XlsxLedger`] is the on-disk implementation.

pub mod package;
pub mod sheet_xml;
pub mod xlsx;

pub use xlsx::XlsxLedger;

use crate::config::{Config, DataEntryMappings};
use crate::error::Result;
use crate::report::{read_all, Report, ReportReader};
use qc_automation_common::value::column_index;
use qc_automation_common::{sort_by_key, CellRange, CellRef, CellValue};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Rows scanned past the end of the table when looking for the next free row.
pub const FREE_ROW_LOOKAHEAD: u32 = 500;

pub trait LedgerSheet {
    /// Address of the target table, header row included.
    fn table_range(&self) -> CellRange;
    fn value(&self, cell: CellRef) -> CellValue;
    fn write(&mut self, cell: CellRef, value: CellValue) -> Result<()>;
    fn save(&mut self) -> Result<()>;
}

/// Empties the serial column over the table's data rows.
pub fn clear_serial_numbers(sheet: &mut dyn LedgerSheet, serial_column: u32) -> Result<()> {
    let table = sheet.table_range();
    info!("Clearing serial number column of the table...");
    for row in table.start.row + 1..=table.end.row {
        sheet.write(CellRef::new(row, serial_column), CellValue::Empty)?;
    }
    info!("Serial number column cleared successfully.");
    Ok(())
}

/// First row whose invoice cell is empty, scanning from the first data row to
/// [`FREE_ROW_LOOKAHEAD`] rows past the table. Never earlier than `min_start_row`.
pub fn next_free_row(sheet: &dyn LedgerSheet, invoice_column: u32, min_start_row: u32) -> u32 {
    let table = sheet.table_range();
    let last_scanned = table.end.row + FREE_ROW_LOOKAHEAD;
    let row = (table.start.row + 1..=last_scanned)
        .find(|&row| matches!(sheet.value(CellRef::new(row, invoice_column)), CellValue::Empty))
        .unwrap_or(last_scanned + 1);
    row.max(min_start_row)
}

/// Writes the sorted reports as consecutive ledger rows and returns the
/// number of rows written. Cell failures are logged and skipped.
pub fn enter_rows(
    sheet: &mut dyn LedgerSheet,
    reports: &[Report],
    mappings: &DataEntryMappings,
) -> Result<usize> {
    let serial_column = column_index(&mappings.serial_column)?;
    let invoice_column = column_index(&mappings.invoice_column)?;

    clear_serial_numbers(sheet, serial_column)?;

    let mut next_row = next_free_row(sheet, invoice_column, mappings.min_start_row);
    info!("Data entry will start from row {}.", next_row);

    let mut written = 0;
    for report in reports {
        let Ok(entry) = &report.entry else { continue };
        info!("   -> Writing data for: {}", report.file_name());

        written += 1;
        sheet.write(
            CellRef::new(next_row, serial_column),
            CellValue::Number(written as f64),
        )?;

        for (column, value) in entry {
            let cell = match column_index(column) {
                Ok(col) => CellRef::new(next_row, col),
                Err(e) => {
                    warn!("Could not write to row {}, column {}: {}", next_row, column, e);
                    continue;
                }
            };
            if let Err(e) = sheet.write(cell, value.clone()) {
                warn!("Could not write to row {}, column {}: {}", next_row, column, e);
            }
        }
        next_row += 1;
    }
    Ok(written)
}

/// Task 1: ledger data entry.
pub struct LedgerWriter<'a> {
    config: &'a Config,
}

impl<'a> LedgerWriter<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn run(&self, files: &[PathBuf]) -> usize {
        info!("{}", "=".repeat(50));
        info!("TASK 1: Starting Data Entry into Main Workbook...");
        info!("{}", "=".repeat(50));

        if files.is_empty() {
            warn!("No files found for data entry.");
            return 0;
        }

        info!("Collecting and sorting data from files...");
        let reader = ReportReader::new(self.config);
        let mut reports: Vec<Report> = read_all(&reader, files)
            .into_iter()
            .filter(|r| match &r.entry {
                Ok(_) => true,
                Err(e) => {
                    error!("Could not extract ledger data from '{}': {}", r.file_name(), e);
                    false
                }
            })
            .collect();
        sort_by_key(&mut reports, |r| &r.sort_key);
        info!("Data sorted successfully.");

        let ledger_path = &self.config.paths.main_workbook;
        if !ledger_path.is_file() {
            error!("Main workbook not found at: '{}'", ledger_path.display());
            return 0;
        }

        match self.write_ledger(ledger_path, &reports) {
            Ok(count) => {
                info!("Data entry completed successfully!");
                self.backup(ledger_path);
                count
            }
            Err(e) => {
                error!("An unexpected error occurred during data entry: {}", e);
                0
            }
        }
    }

    fn write_ledger(&self, path: &Path, reports: &[Report]) -> Result<usize> {
        let mappings = &self.config.mappings_data_entry;
        let mut ledger = XlsxLedger::open(
            path,
            &mappings.target_sheet_name,
            &mappings.target_table_name,
        )?;
        let count = enter_rows(&mut ledger, reports, mappings)?;
        ledger.save()?;
        Ok(count)
    }

    fn backup(&self, ledger_path: &Path) {
        let backup_dir = &self.config.paths.main_workbook_backup;
        let result = std::fs::create_dir_all(backup_dir).and_then(|_| {
            let target = backup_dir.join(ledger_path.file_name().unwrap_or_default());
            std::fs::copy(ledger_path, &target).map(|_| target)
        });
        match result {
            Ok(target) => info!(
                "A backup of the main file was successfully created at '{}'.",
                target.display()
            ),
            Err(e) => error!("Error creating backup: {}", e),
        }
    }
}
