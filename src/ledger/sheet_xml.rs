//! Streaming cell patch of a worksheet part
//!
//! Cells are replaced in place (keeping their `s` style index) or inserted in
//! column order; missing rows are inserted in row order. Everything else in
//! the part passes through untouched.

use crate::error::{QcError, Result};
use chrono::NaiveDate;
use qc_automation_common::value::format_number;
use qc_automation_common::{CellRange, CellRef, CellValue};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;

type RowCells = BTreeMap<u32, CellValue>;

fn emit<'a>(writer: &mut Writer<Vec<u8>>, event: impl Into<Event<'a>>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| QcError::Package(format!("worksheet write failed: {}", e)))
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .with_checks(false)
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Element name with the namespace prefix used by the sheet, if any.
fn qualified(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{}:{}", prefix, local)
    }
}

fn prefix_of(e: &BytesStart<'_>) -> String {
    e.name()
        .prefix()
        .map(|p| String::from_utf8_lossy(p.as_ref()).into_owned())
        .unwrap_or_default()
}

/// Days since the 1900 date system epoch.
fn excel_serial(value: &chrono::NaiveDateTime) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    let delta = *value - epoch;
    delta.num_seconds() as f64 / 86_400.0
}

/// `<col min max style>` entry of the `cols` block.
struct ColumnStyle {
    min: u32,
    max: u32,
    style: String,
}

fn column_style(e: &BytesStart<'_>) -> Option<ColumnStyle> {
    Some(ColumnStyle {
        min: attr_value(e, b"min")?.parse().ok()?,
        max: attr_value(e, b"max")?.parse().ok()?,
        style: attr_value(e, b"style")?,
    })
}

/// Style a row imposes on its cells; only set when `customFormat` is on.
fn row_style(e: &BytesStart<'_>) -> Option<String> {
    match attr_value(e, b"customFormat").as_deref() {
        Some("1") | Some("true") => attr_value(e, b"s"),
        _ => None,
    }
}

struct CellWriter {
    prefix: String,
    columns: Vec<ColumnStyle>,
}

impl CellWriter {
    /// Style for a newly inserted cell: the row's, else its column's.
    fn inherited_style<'a>(&'a self, col: u32, row_style: Option<&'a str>) -> Option<&'a str> {
        row_style.or_else(|| {
            self.columns
                .iter()
                .find(|c| (c.min..=c.max).contains(&col))
                .map(|c| c.style.as_str())
        })
    }

    fn write_cell(
        &self,
        writer: &mut Writer<Vec<u8>>,
        cell: CellRef,
        value: &CellValue,
        style: Option<&str>,
    ) -> Result<()> {
        let c_name = qualified(&self.prefix, "c");
        let reference = cell.to_string();
        let mut start = BytesStart::new(c_name.as_str());
        start.push_attribute(("r", reference.as_str()));
        if let Some(s) = style {
            start.push_attribute(("s", s));
        }

        let number = match value {
            CellValue::Empty => {
                return emit(writer, Event::Empty(start));
            }
            CellValue::Number(n) if n.is_finite() => Some(format_number_exact(*n)),
            CellValue::Number(n) => {
                return self.write_inline_string(writer, start, &n.to_string(), &c_name);
            }
            CellValue::Date(d) => Some(format_number_exact(excel_serial(d))),
            CellValue::Bool(b) => {
                start.push_attribute(("t", "b"));
                Some(if *b { "1".to_string() } else { "0".to_string() })
            }
            CellValue::Text(text) => {
                return self.write_inline_string(writer, start, text, &c_name);
            }
        };

        emit(writer, Event::Start(start))?;
        if let Some(v) = number {
            let v_name = qualified(&self.prefix, "v");
            emit(writer, Event::Start(BytesStart::new(v_name.as_str())))?;
            emit(writer, Event::Text(BytesText::new(&v)))?;
            emit(writer, Event::End(BytesEnd::new(v_name.as_str())))?;
        }
        emit(writer, Event::End(BytesEnd::new(c_name.as_str())))
    }

    fn write_inline_string(
        &self,
        writer: &mut Writer<Vec<u8>>,
        mut start: BytesStart<'_>,
        text: &str,
        c_name: &str,
    ) -> Result<()> {
        start.push_attribute(("t", "inlineStr"));
        emit(writer, Event::Start(start))?;

        let is_name = qualified(&self.prefix, "is");
        let t_name = qualified(&self.prefix, "t");
        emit(writer, Event::Start(BytesStart::new(is_name.as_str())))?;
        let mut t = BytesStart::new(t_name.as_str());
        if text.trim() != text {
            t.push_attribute(("xml:space", "preserve"));
        }
        emit(writer, Event::Start(t))?;
        emit(writer, Event::Text(BytesText::new(text)))?;
        emit(writer, Event::End(BytesEnd::new(t_name.as_str())))?;
        emit(writer, Event::End(BytesEnd::new(is_name.as_str())))?;
        emit(writer, Event::End(BytesEnd::new(c_name)))
    }

    fn write_cells(
        &self,
        writer: &mut Writer<Vec<u8>>,
        row: u32,
        cells: &RowCells,
        row_style: Option<&str>,
    ) -> Result<()> {
        for (col, value) in cells {
            let style = self.inherited_style(*col, row_style);
            self.write_cell(writer, CellRef::new(row, *col), value, style)?;
        }
        Ok(())
    }

    fn write_row(&self, writer: &mut Writer<Vec<u8>>, row: u32, cells: &RowCells) -> Result<()> {
        let row_name = qualified(&self.prefix, "row");
        let r = row.to_string();
        let mut start = BytesStart::new(row_name.as_str());
        start.push_attribute(("r", r.as_str()));
        emit(writer, Event::Start(start))?;
        self.write_cells(writer, row, cells, None)?;
        emit(writer, Event::End(BytesEnd::new(row_name.as_str())))
    }
}

/// `20.0` -> `"20"`, otherwise the shortest round-trip form.
fn format_number_exact(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format_number(n)
    } else {
        format!("{}", n)
    }
}

/// Copy of a `row` start tag without the `spans` hint, which may no longer
/// cover the patched cells.
fn row_without_spans(e: &BytesStart<'_>) -> BytesStart<'static> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut start = BytesStart::new(name);
    for attr in e.attributes().with_checks(false).flatten() {
        if attr.key.as_ref() != b"spans" {
            start.push_attribute(attr);
        }
    }
    start.into_owned()
}

/// Widens the `dimension` ref to the written cells.
fn widened_dimension(e: &BytesStart<'_>, written: Option<CellRange>) -> BytesStart<'static> {
    let current = attr_value(e, b"ref").and_then(|r| CellRange::parse(&r).ok());
    let merged = match (current, written) {
        (Some(cur), Some(w)) => Some(CellRange {
            start: CellRef::new(cur.start.row.min(w.start.row), cur.start.col.min(w.start.col)),
            end: CellRef::new(cur.end.row.max(w.end.row), cur.end.col.max(w.end.col)),
        }),
        (cur, w) => cur.or(w),
    };

    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut start = BytesStart::new(name);
    for attr in e.attributes().with_checks(false).flatten() {
        if attr.key.as_ref() != b"ref" {
            start.push_attribute(attr);
        }
    }
    if let Some(range) = merged {
        start.push_attribute(("ref", range.to_string().as_str()));
    }
    start.into_owned()
}

fn bounding_range(writes: &BTreeMap<CellRef, CellValue>) -> Option<CellRange> {
    let first = writes.keys().next()?;
    let mut range = CellRange {
        start: *first,
        end: *first,
    };
    for cell in writes.keys() {
        range.start.row = range.start.row.min(cell.row);
        range.start.col = range.start.col.min(cell.col);
        range.end.row = range.end.row.max(cell.row);
        range.end.col = range.end.col.max(cell.col);
    }
    Some(range)
}

/// Applies cell writes to worksheet XML.
pub fn apply_writes(xml: &str, writes: &BTreeMap<CellRef, CellValue>) -> Result<String> {
    let mut pending: BTreeMap<u32, RowCells> = BTreeMap::new();
    for (cell, value) in writes {
        pending
            .entry(cell.row)
            .or_default()
            .insert(cell.col, value.clone());
    }
    let written = bounding_range(writes);

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + writes.len() * 64));

    let mut cells = CellWriter {
        prefix: String::new(),
        columns: Vec::new(),
    };
    let mut in_sheet_data = false;
    let mut last_row: u32 = 0;
    // row currently open, the writes still due in it and its style
    let mut open_row: Option<(u32, RowCells, Option<String>)> = None;
    let mut last_col: u32 = 0;

    loop {
        let event = reader.read_event()?;
        match event {
            Event::Eof => break,

            Event::Empty(ref e) if e.local_name().as_ref() == b"dimension" => {
                emit(&mut writer, Event::Empty(widened_dimension(e, written)))?;
            }

            Event::Empty(ref e) if !in_sheet_data && e.local_name().as_ref() == b"col" => {
                cells.columns.extend(column_style(e));
                emit(&mut writer, event.borrow())?;
            }

            Event::Start(ref e) if e.local_name().as_ref() == b"sheetData" => {
                cells.prefix = prefix_of(e);
                in_sheet_data = true;
                emit(&mut writer, event.borrow())?;
            }
            Event::Empty(ref e) if e.local_name().as_ref() == b"sheetData" => {
                cells.prefix = prefix_of(e);
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                emit(&mut writer, Event::Start(e.to_owned()))?;
                for (row, row_cells) in std::mem::take(&mut pending) {
                    cells.write_row(&mut writer, row, &row_cells)?;
                }
                emit(&mut writer, Event::End(BytesEnd::new(name)))?;
            }
            Event::End(ref e) if e.local_name().as_ref() == b"sheetData" => {
                for (row, row_cells) in std::mem::take(&mut pending) {
                    cells.write_row(&mut writer, row, &row_cells)?;
                }
                in_sheet_data = false;
                emit(&mut writer, event.borrow())?;
            }

            Event::Start(ref e) | Event::Empty(ref e)
                if in_sheet_data && e.local_name().as_ref() == b"row" =>
            {
                let is_empty = matches!(event, Event::Empty(_));
                let row = attr_value(e, b"r")
                    .and_then(|r| r.parse::<u32>().ok())
                    .unwrap_or(last_row + 1);
                last_row = row;
                last_col = 0;

                let earlier: Vec<u32> = pending.range(..row).map(|(r, _)| *r).collect();
                for r in earlier {
                    if let Some(row_cells) = pending.remove(&r) {
                        cells.write_row(&mut writer, r, &row_cells)?;
                    }
                }

                match pending.remove(&row) {
                    Some(row_cells) => {
                        let start = row_without_spans(e);
                        let style = row_style(e);
                        if is_empty {
                            let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                            emit(&mut writer, Event::Start(start))?;
                            cells.write_cells(&mut writer, row, &row_cells, style.as_deref())?;
                            emit(&mut writer, Event::End(BytesEnd::new(name)))?;
                        } else {
                            emit(&mut writer, Event::Start(start))?;
                            open_row = Some((row, row_cells, style));
                        }
                    }
                    None => emit(&mut writer, event.borrow())?,
                }
            }
            Event::End(ref e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                if let Some((row, row_cells, style)) = open_row.take() {
                    cells.write_cells(&mut writer, row, &row_cells, style.as_deref())?;
                }
                emit(&mut writer, event.borrow())?;
            }

            Event::Start(ref e) | Event::Empty(ref e)
                if open_row.is_some() && e.local_name().as_ref() == b"c" =>
            {
                let is_empty = matches!(event, Event::Empty(_));
                let Some((row, row_cells, row_style)) = open_row.as_mut() else {
                    emit(&mut writer, event.borrow())?;
                    continue;
                };
                let row = *row;
                let row_style = row_style.as_deref();
                let col = attr_value(e, b"r")
                    .and_then(|r| CellRef::parse(&r).ok())
                    .map(|c| c.col)
                    .unwrap_or(last_col + 1);
                last_col = col;

                let earlier: Vec<u32> = row_cells.range(..col).map(|(c, _)| *c).collect();
                for c in earlier {
                    if let Some(value) = row_cells.remove(&c) {
                        let style = cells.inherited_style(c, row_style);
                        cells.write_cell(&mut writer, CellRef::new(row, c), &value, style)?;
                    }
                }

                match row_cells.remove(&col) {
                    Some(value) => {
                        let style = attr_value(e, b"s");
                        if !is_empty {
                            skip_to_cell_end(&mut reader)?;
                        }
                        cells.write_cell(&mut writer, CellRef::new(row, col), &value, style.as_deref())?;
                    }
                    None => emit(&mut writer, event.borrow())?,
                }
            }

            other => emit(&mut writer, other)?,
        }
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| QcError::Package(format!("worksheet is not UTF-8: {}", e)))
}

/// Skips the children of an open `<c>` element, consuming its end tag.
fn skip_to_cell_end(reader: &mut Reader<&[u8]>) -> Result<()> {
    loop {
        match reader.read_event()? {
            Event::End(e) if e.local_name().as_ref() == b"c" => return Ok(()),
            Event::Eof => {
                return Err(QcError::Package("unterminated <c> element".into()));
            }
            _ => {}
        }
    }
}
