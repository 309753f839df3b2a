//! Ledger workbook edited at the package level
//!
//! Only the target worksheet part, its table part and the calculation chain
//! are rewritten on save; shapes, drawings, styles, defined names and every
//! other sheet are copied byte for byte.

use super::package::{part_dir, rels_path, resolve_target, XlsxPackage};
use super::sheet_xml::apply_writes;
use super::LedgerSheet;
use crate::error::{QcError, Result};
use crate::report::{sheet_range, to_cell_value};
use calamine::{open_workbook, Data, Range, Xlsx};
use qc_automation_common::{CellRange, CellRef, CellValue};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const DEFAULT_WORKBOOK_PART: &str = "xl/workbook.xml";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const MAX_ROW: u32 = 1_048_576;
const MAX_COL: u32 = 16_384;

#[derive(Debug, Clone)]
struct Relationship {
    rel_type: String,
    target: String,
    id: String,
}

fn relationships(package: &XlsxPackage, rels_part: &str) -> Result<Vec<Relationship>> {
    if package.part(rels_part).is_none() {
        return Ok(Vec::new());
    }
    let xml = package.part_str(rels_part)?;
    let doc = roxmltree::Document::parse(xml)?;
    Ok(doc
        .descendants()
        .filter(|n| n.tag_name().name() == "Relationship")
        .map(|n| Relationship {
            rel_type: n.attribute("Type").unwrap_or_default().to_string(),
            target: n.attribute("Target").unwrap_or_default().to_string(),
            id: n.attribute("Id").unwrap_or_default().to_string(),
        })
        .collect())
}

fn workbook_part(package: &XlsxPackage) -> Result<String> {
    let root = relationships(package, "_rels/.rels")?;
    Ok(root
        .iter()
        .find(|r| r.rel_type.ends_with("/officeDocument"))
        .map(|r| resolve_target("", &r.target))
        .unwrap_or_else(|| DEFAULT_WORKBOOK_PART.to_string()))
}

fn find_sheet_part(package: &XlsxPackage, workbook: &str, sheet_name: &str) -> Result<String> {
    let xml = package.part_str(workbook)?;
    let doc = roxmltree::Document::parse(xml)?;
    let rel_id = doc
        .descendants()
        .filter(|n| n.tag_name().name() == "sheet")
        .find(|n| n.attribute("name") == Some(sheet_name))
        .and_then(|n| n.attribute((REL_NS, "id")))
        .ok_or_else(|| QcError::SheetNotFound {
            file: workbook.to_string(),
            sheet: sheet_name.to_string(),
        })?;

    relationships(package, &rels_path(workbook))?
        .into_iter()
        .find(|r| r.id == rel_id)
        .map(|r| resolve_target(part_dir(workbook), &r.target))
        .ok_or_else(|| QcError::Package(format!("no relationship '{}' for sheet '{}'", rel_id, sheet_name)))
}

fn find_table(package: &XlsxPackage, sheet_part: &str, table_name: &str) -> Result<(String, CellRange)> {
    for rel in relationships(package, &rels_path(sheet_part))? {
        if !rel.rel_type.ends_with("/table") {
            continue;
        }
        let table_part = resolve_target(part_dir(sheet_part), &rel.target);
        let xml = package.part_str(&table_part)?;
        let doc = roxmltree::Document::parse(xml)?;
        let root = doc.root_element();

        let matches = ["name", "displayName"].iter().any(|attr| {
            root.attribute(*attr)
                .is_some_and(|n| n.eq_ignore_ascii_case(table_name))
        });
        if !matches {
            continue;
        }

        let reference = root
            .attribute("ref")
            .ok_or_else(|| QcError::Package(format!("table '{}' has no ref", table_name)))?;
        return Ok((table_part, CellRange::parse(reference)?));
    }
    Err(QcError::TableNotFound(table_name.to_string()))
}

fn emit<'a>(writer: &mut Writer<Vec<u8>>, event: impl Into<Event<'a>>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| QcError::Package(format!("XML write failed: {}", e)))
}

fn with_ref(e: &BytesStart<'_>, reference: &str) -> BytesStart<'static> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut start = BytesStart::new(name);
    for attr in e.attributes().with_checks(false).flatten() {
        if attr.key.as_ref() == b"ref" {
            start.push_attribute(("ref", reference));
        } else {
            start.push_attribute(attr);
        }
    }
    start.into_owned()
}

/// Points the table (and its auto filter) at `range`.
fn retarget_table(xml: &str, range: CellRange) -> Result<String> {
    let reference = range.to_string();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) if matches!(e.local_name().as_ref(), b"table" | b"autoFilter") => {
                emit(&mut writer, Event::Start(with_ref(&e, &reference)))?;
            }
            Event::Empty(e) if matches!(e.local_name().as_ref(), b"table" | b"autoFilter") => {
                emit(&mut writer, Event::Empty(with_ref(&e, &reference)))?;
            }
            other => emit(&mut writer, other)?,
        }
    }

    String::from_utf8(writer.into_inner()).map_err(|e| QcError::Package(e.to_string()))
}

/// Drops empty elements matching `remove`.
fn drop_elements(xml: &str, remove: impl Fn(&BytesStart<'_>) -> bool) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Empty(e) if remove(&e) => {}
            other => emit(&mut writer, other)?,
        }
    }

    String::from_utf8(writer.into_inner()).map_err(|e| QcError::Package(e.to_string()))
}

fn attr_equals(e: &BytesStart<'_>, key: &[u8], predicate: impl Fn(&str) -> bool) -> bool {
    e.attributes()
        .with_checks(false)
        .flatten()
        .any(|a| a.key.as_ref() == key && predicate(String::from_utf8_lossy(&a.value).as_ref()))
}

/// Removes the calculation chain so Excel rebuilds it for the patched cells.
fn drop_calc_chain(package: &mut XlsxPackage, workbook: &str) -> Result<()> {
    let calc_part = resolve_target(part_dir(workbook), "calcChain.xml");
    if !package.remove_part(&calc_part) {
        return Ok(());
    }

    let rels = rels_path(workbook);
    if package.part(&rels).is_some() {
        let xml = drop_elements(package.part_str(&rels)?, |e| {
            attr_equals(e, b"Type", |t| t.ends_with("/calcChain"))
        })?;
        package.replace_part(&rels, xml.into_bytes());
    }

    if package.part(CONTENT_TYPES_PART).is_some() {
        let part_name = format!("/{}", calc_part);
        let xml = drop_elements(package.part_str(CONTENT_TYPES_PART)?, |e| {
            attr_equals(e, b"PartName", |p| p == part_name)
        })?;
        package.replace_part(CONTENT_TYPES_PART, xml.into_bytes());
    }
    Ok(())
}

/// Ledger sheet of an `.xlsx` / `.xlsm` workbook on disk.
pub struct XlsxLedger {
    path: PathBuf,
    package: XlsxPackage,
    workbook_part: String,
    sheet_part: String,
    table_part: String,
    table_range: CellRange,
    values: Range<Data>,
    writes: BTreeMap<CellRef, CellValue>,
}

impl XlsxLedger {
    pub fn open(path: &Path, sheet_name: &str, table_name: &str) -> Result<Self> {
        let package = XlsxPackage::open(path)?;
        let workbook_part = workbook_part(&package)?;
        let sheet_part = find_sheet_part(&package, &workbook_part, sheet_name)?;
        let (table_part, table_range) = find_table(&package, &sheet_part, table_name)?;

        let values = {
            let mut workbook: Xlsx<_> = open_workbook(path)?;
            sheet_range(&mut workbook, path, sheet_name)?
        };

        info!(
            "Opened ledger sheet '{}' with table '{}' at {}",
            sheet_name, table_name, table_range
        );

        Ok(Self {
            path: path.to_path_buf(),
            package,
            workbook_part,
            sheet_part,
            table_part,
            table_range,
            values,
            writes: BTreeMap::new(),
        })
    }
}

impl LedgerSheet for XlsxLedger {
    fn table_range(&self) -> CellRange {
        self.table_range
    }

    fn value(&self, cell: CellRef) -> CellValue {
        match self.writes.get(&cell) {
            Some(v) => v.clone(),
            None => self
                .values
                .get_value(cell.zero_based())
                .map(to_cell_value)
                .unwrap_or_default(),
        }
    }

    fn write(&mut self, cell: CellRef, value: CellValue) -> Result<()> {
        if cell.row == 0 || cell.row > MAX_ROW || cell.col == 0 || cell.col > MAX_COL {
            return Err(QcError::CellWrite {
                cell: cell.to_string(),
                reason: "outside the worksheet".into(),
            });
        }
        self.writes.insert(cell, value);
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        let sheet_xml = apply_writes(self.package.part_str(&self.sheet_part)?, &self.writes)?;
        self.package.replace_part(&self.sheet_part, sheet_xml.into_bytes());

        let last_written = self.writes.keys().map(|c| c.row).max().unwrap_or(0);
        if last_written > self.table_range.end.row {
            self.table_range.end.row = last_written;
            let table_xml = retarget_table(self.package.part_str(&self.table_part)?, self.table_range)?;
            self.package.replace_part(&self.table_part, table_xml.into_bytes());
            info!("Table extended to {}", self.table_range);
        }

        drop_calc_chain(&mut self.package, &self.workbook_part)?;
        self.package.save(&self.path)
    }
}
