//! Inspection report extraction
//!
//! One workbook is opened per report and dropped before the next one is read.
//! Reading yields a [`Report`] carrying:
//! - the organisation fields of `cell_map_organization`
//! - the summary figures used by the classifier (or why they could not be read)
//! - the ledger entry for data entry (or why it could not be built)

use crate::config::{CellMap, Config, DataEntryMappings};
use crate::error::{QcError, Result};
use calamine::{open_workbook, Data, DataType, Range, Reader, SheetVisible, Xlsx, XlsxError};
use qc_automation_common::classifier::{is_fail_result, is_pass_result, SHADING_FIRST_ROW, SHADING_LAST_ROW};
use qc_automation_common::email::DraftLine;
use qc_automation_common::value::column_index;
use qc_automation_common::{
    classify, count_critical_rolls, safe_float, CellRef, CellValue, Decision, FilingFields,
    PassReportTriggers, ShadingGrid, SortKey, SummaryFigures,
};
use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

/// Prefix of the per-roll page sheets.
pub const PAGE_SHEET_PREFIX: &str = "Page ";
/// Defect rows on a page sheet (1-based, inclusive).
pub const DEFECT_FIRST_ROW: u32 = 23;
pub const DEFECT_LAST_ROW: u32 = 38;
/// Defect point columns V..AO.
pub const DEFECT_FIRST_COLUMN: &str = "V";
pub const DEFECT_LAST_COLUMN: &str = "AO";

/// Ledger column -> value to write.
pub type LedgerEntry = BTreeMap<String, CellValue>;

#[derive(Debug, Clone)]
pub struct Report {
    pub path: PathBuf,
    /// Organisation fields, raw typed values
    pub fields: BTreeMap<String, CellValue>,
    pub figures: std::result::Result<SummaryFigures, String>,
    pub entry: std::result::Result<LedgerEntry, String>,
    pub sort_key: SortKey,
}

impl Report {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn raw(&self, field: &str) -> CellValue {
        self.fields.get(field).cloned().unwrap_or_default()
    }

    /// Trimmed string form of a field; unmapped or blank fields are `""`.
    pub fn field(&self, field: &str) -> String {
        self.fields
            .get(field)
            .map(CellValue::display_string)
            .unwrap_or_default()
    }

    pub fn result_text(&self) -> String {
        self.field("result")
    }

    /// Send/review decision. A PASS report whose figures could not be read is
    /// sent to review with the analysis error as reason.
    pub fn classify(&self, triggers: &PassReportTriggers) -> Decision {
        let result = self.result_text();
        match &self.figures {
            Ok(figures) => classify(&result, figures, triggers),
            Err(reason) if is_pass_result(&result) && !is_fail_result(&result) => {
                Decision::review(format!("Analysis error: {}", reason))
            }
            Err(_) => classify(&result, &SummaryFigures::default(), triggers),
        }
    }

    pub fn filing_fields(&self) -> FilingFields {
        FilingFields {
            buyer: self.raw("buyer"),
            supplier: self.raw("supplier"),
            consignment: self.raw("consignment"),
            style: self.raw("style"),
            color: self.raw("color"),
            rolls: self.raw("rolls"),
            fabric_code: self.raw("fabric_code"),
            date: self.raw("date"),
        }
    }

    pub fn draft_line(&self) -> DraftLine {
        DraftLine {
            style: self.field("style"),
            color: self.field("color"),
            rolls: self.field("rolls"),
            result: self.result_text(),
            comment: self.field("comment"),
            consignment: self.field("consignment"),
        }
    }
}

/// Converts a calamine cell.
pub fn to_cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(_) | Data::DateTimeIso(_) => match data.as_datetime() {
            Some(dt) => CellValue::Date(dt),
            None => CellValue::Text(data.to_string()),
        },
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

/// Value at a 1-based cell; cells outside the used range are empty.
pub fn cell_at(range: &Range<Data>, cell: CellRef) -> CellValue {
    range
        .get_value(cell.zero_based())
        .map(to_cell_value)
        .unwrap_or_default()
}

/// Last used column of a sheet (1-based), 0 for an empty sheet.
fn last_column(range: &Range<Data>) -> u32 {
    range.end().map(|(_, col)| col + 1).unwrap_or(0)
}

pub(crate) fn sheet_range<RS: Read + Seek>(
    workbook: &mut Xlsx<RS>,
    path: &Path,
    sheet: &str,
) -> Result<Range<Data>> {
    match workbook.worksheet_range(sheet) {
        Ok(range) => Ok(range),
        Err(XlsxError::WorksheetNotFound(_)) => Err(QcError::SheetNotFound {
            file: path.display().to_string(),
            sheet: sheet.to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Names of visible sheets called `Page …`, in workbook order.
fn visible_page_sheets<RS: Read + Seek>(workbook: &Xlsx<RS>) -> Vec<String> {
    workbook
        .sheets_metadata()
        .iter()
        .filter(|s| s.name.starts_with(PAGE_SHEET_PREFIX) && s.visible == SheetVisible::Visible)
        .map(|s| s.name.clone())
        .collect()
}

pub struct ReportReader<'a> {
    cell_map: &'a CellMap,
    mappings: &'a DataEntryMappings,
}

impl<'a> ReportReader<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            cell_map: &config.cell_map_organization,
            mappings: &config.mappings_data_entry,
        }
    }

    /// Reads one report. Fails only when the workbook or its organisation
    /// sheet cannot be read.
    pub fn read(&self, path: &Path) -> Result<Report> {
        let mut workbook: Xlsx<_> = open_workbook(path)?;
        let summary = sheet_range(&mut workbook, path, &self.cell_map.sheet_name)?;

        let mut fields = BTreeMap::new();
        for (name, address) in &self.cell_map.fields {
            let cell = CellRef::parse(address)?;
            fields.insert(name.clone(), cell_at(&summary, cell));
        }

        let field = |name: &str| fields.get(name).cloned().unwrap_or_default();
        let sort_key = SortKey::from_cells(
            &field("buyer"),
            &field("consignment"),
            &field("result"),
            &field("rolls"),
        );

        let pages = visible_page_sheets(&workbook);
        let mut page_ranges = Vec::with_capacity(pages.len());
        let mut page_error = None;
        for name in &pages {
            match sheet_range(&mut workbook, path, name) {
                Ok(range) => page_ranges.push(range),
                Err(e) => {
                    page_error = Some(e.to_string());
                    break;
                }
            }
        }

        let figures = match &page_error {
            Some(reason) => Err(reason.clone()),
            None => Ok(self.summary_figures(&fields, &page_ranges)),
        };

        let entry = match &page_error {
            Some(reason) => Err(reason.clone()),
            None => self
                .ledger_entry(&mut workbook, path, &page_ranges)
                .map_err(|e| e.to_string()),
        };

        Ok(Report {
            path: path.to_path_buf(),
            fields,
            figures,
            entry,
            sort_key,
        })
    }

    fn summary_figures(
        &self,
        fields: &BTreeMap<String, CellValue>,
        page_ranges: &[Range<Data>],
    ) -> SummaryFigures {
        let number = |name: &str| fields.get(name).map(safe_float).unwrap_or(0.0);

        SummaryFigures {
            order_width: number("order_width"),
            actual_width: number("actual_width"),
            ticked_yards: number("ticked_yards"),
            total_short_excess: number("total_short_excess"),
            avg_point: number("avg_point"),
            check_roll: number("check_roll") as i64,
            critical_shade_rolls: count_critical_rolls(&shading_grids(page_ranges)),
        }
    }

    fn ledger_entry<RS: Read + Seek>(
        &self,
        workbook: &mut Xlsx<RS>,
        path: &Path,
        page_ranges: &[Range<Data>],
    ) -> Result<LedgerEntry> {
        let summary = sheet_range(workbook, path, &self.mappings.summary_sheet_name)?;

        let mut entry = LedgerEntry::new();
        for (source, target) in &self.mappings.summary_mapping {
            let cell = CellRef::parse(source)?;
            entry.insert(target.trim().to_uppercase(), cell_at(&summary, cell));
        }

        let (defects, unmatched) = defect_points(page_ranges, &self.mappings.defect_mapping)?;
        for (column, points) in defects {
            entry.insert(column, CellValue::Number(points));
        }
        entry.insert(
            self.mappings.unmatched_defect_column.trim().to_uppercase(),
            CellValue::Number(unmatched),
        );

        Ok(entry)
    }
}

/// Sums defect rows 23..=38 across V..AO per mapped defect column.
///
/// Labels in column A match the mapping case-insensitively after trimming;
/// rows with unmatched labels add to the returned unmatched total. Every
/// mapped column is present, starting at 0.
pub fn defect_points(
    page_ranges: &[Range<Data>],
    defect_mapping: &BTreeMap<String, String>,
) -> Result<(BTreeMap<String, f64>, f64)> {
    let normalized: HashMap<String, String> = defect_mapping
        .iter()
        .map(|(label, column)| (label.trim().to_lowercase(), column.trim().to_uppercase()))
        .collect();

    let mut points: BTreeMap<String, f64> =
        normalized.values().map(|column| (column.clone(), 0.0)).collect();
    let mut unmatched = 0.0;

    let first_col = column_index(DEFECT_FIRST_COLUMN)?;
    let last_col = column_index(DEFECT_LAST_COLUMN)?;

    for range in page_ranges {
        for row in DEFECT_FIRST_ROW..=DEFECT_LAST_ROW {
            let label = cell_at(range, CellRef::new(row, 1)).display_string();
            if label.is_empty() {
                continue;
            }

            let row_sum: f64 = (first_col..=last_col)
                .map(|col| safe_float(&cell_at(range, CellRef::new(row, col))))
                .sum();

            match normalized.get(&label.to_lowercase()) {
                Some(column) => *points.entry(column.clone()).or_insert(0.0) += row_sum,
                None => unmatched += row_sum,
            }
        }
    }

    Ok((points, unmatched))
}

/// Shading grade rows of each page sheet.
pub fn shading_grids(page_ranges: &[Range<Data>]) -> Vec<ShadingGrid> {
    page_ranges
        .iter()
        .map(|range| {
            let last_col = last_column(range);
            let rows = (SHADING_FIRST_ROW..=SHADING_LAST_ROW)
                .map(|row| {
                    (1..=last_col)
                        .map(|col| cell_at(range, CellRef::new(row, col)))
                        .collect()
                })
                .collect();
            ShadingGrid::new(last_col, rows)
        })
        .collect()
}

/// Reads every report, logging and skipping the unreadable ones.
pub fn read_all(reader: &ReportReader<'_>, files: &[PathBuf]) -> Vec<Report> {
    let mut reports = Vec::with_capacity(files.len());
    for file in files {
        match reader.read(file) {
            Ok(report) => reports.push(report),
            Err(e) => {
                let name = file
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                tracing::error!("Could not read data from '{}': {}", name, e);
            }
        }
    }
    reports
}
