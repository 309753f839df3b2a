//! Cell values and spreadsheet addressing
//!
//! Report workbooks hand us loosely typed cells: numbers stored as text,
//! blanks where a figure is expected, dates in either form. Everything that
//! needs a number goes through [`safe_float`], which never fails.

use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell value as read from (or written to) a workbook.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    Date(NaiveDateTime),
}

impl CellValue {
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Trimmed string form; blanks become `""`.
    pub fn display_string(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::Date(d) => d.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_string())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// Integral values print without a fractional part (`20.0` -> `"20"`).
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Numeric coercion that never fails: blanks and non-numeric values are `0.0`.
pub fn safe_float(value: &CellValue) -> f64 {
    match value {
        CellValue::Number(n) => *n,
        CellValue::Text(s) => safe_float_str(s),
        CellValue::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        CellValue::Empty | CellValue::Date(_) => 0.0,
    }
}

/// String flavour of [`safe_float`].
pub fn safe_float_str(s: &str) -> f64 {
    s.trim().parse::<f64>().unwrap_or(0.0)
}

/// 1-based column index of a column name (`"A"` -> 1, `"AO"` -> 41).
pub fn column_index(letters: &str) -> Result<u32> {
    let letters = letters.trim();
    if letters.is_empty() {
        return Err(Error::InvalidCellRef(letters.to_string()));
    }

    let mut index: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(Error::InvalidCellRef(letters.to_string()));
        }
        let digit = (c.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
        index = index
            .checked_mul(26)
            .and_then(|i| i.checked_add(digit))
            .ok_or_else(|| Error::InvalidCellRef(letters.to_string()))?;
    }
    Ok(index)
}

/// Column name of a 1-based index (`41` -> `"AO"`).
pub fn column_letters(mut index: u32) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        index = (index - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A1-style cell address, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parses `"B12"` (absolute markers such as `"$B$12"` are accepted).
    pub fn parse(address: &str) -> Result<Self> {
        let cleaned: String = address.trim().chars().filter(|c| *c != '$').collect();
        let split = cleaned
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| Error::InvalidCellRef(address.to_string()))?;
        let (letters, digits) = cleaned.split_at(split);

        let col = column_index(letters).map_err(|_| Error::InvalidCellRef(address.to_string()))?;
        let row: u32 = digits
            .parse()
            .map_err(|_| Error::InvalidCellRef(address.to_string()))?;
        if row == 0 {
            return Err(Error::InvalidCellRef(address.to_string()));
        }

        Ok(Self { row, col })
    }

    /// 0-based (row, col), the form calamine uses.
    pub fn zero_based(&self) -> (u32, u32) {
        (self.row - 1, self.col - 1)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row)
    }
}

/// Rectangular `A1:B2` range, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl CellRange {
    pub fn parse(range: &str) -> Result<Self> {
        let (first, last) = match range.split_once(':') {
            Some((a, b)) => (a, b),
            None => (range, range),
        };
        let start = CellRef::parse(first)?;
        let end = CellRef::parse(last)?;
        Ok(Self { start, end })
    }

    pub fn row_count(&self) -> u32 {
        self.end.row.saturating_sub(self.start.row) + 1
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_float_blank_and_text() {
        assert_eq!(safe_float(&CellValue::Empty), 0.0);
        assert_eq!(safe_float(&CellValue::Text(String::new())), 0.0);
        assert_eq!(safe_float(&CellValue::Text("   ".into())), 0.0);
        assert_eq!(safe_float(&CellValue::Text("n/a".into())), 0.0);
        assert_eq!(safe_float(&CellValue::Text("12 yds".into())), 0.0);
    }

    #[test]
    fn test_safe_float_numbers_exact() {
        assert_eq!(safe_float(&CellValue::Number(12.75)), 12.75);
        assert_eq!(safe_float(&CellValue::Text(" 3.5 ".into())), 3.5);
        assert_eq!(safe_float(&CellValue::Text("-0.25".into())), -0.25);
        assert_eq!(safe_float(&CellValue::Text("1e2".into())), 100.0);
        assert_eq!(safe_float(&CellValue::Bool(true)), 1.0);
    }

    #[test]
    fn test_display_string() {
        assert_eq!(CellValue::Number(20.0).display_string(), "20");
        assert_eq!(CellValue::Number(2.5).display_string(), "2.5");
        assert_eq!(CellValue::Text("  Acme  ".into()).display_string(), "Acme");
        assert_eq!(CellValue::Empty.display_string(), "");
    }

    #[test]
    fn test_column_index_and_letters() {
        assert_eq!(column_index("A").unwrap(), 1);
        assert_eq!(column_index("V").unwrap(), 22);
        assert_eq!(column_index("ao").unwrap(), 41);
        assert_eq!(column_index("AK").unwrap(), 37);
        assert!(column_index("A1").is_err());
        assert_eq!(column_letters(1), "A");
        assert_eq!(column_letters(26), "Z");
        assert_eq!(column_letters(27), "AA");
        assert_eq!(column_letters(41), "AO");
    }

    #[test]
    fn test_cell_ref_parse() {
        let r = CellRef::parse("B12").unwrap();
        assert_eq!((r.row, r.col), (12, 2));
        assert_eq!(r.zero_based(), (11, 1));
        assert_eq!(CellRef::parse("$AO$38").unwrap(), CellRef::new(38, 41));
        assert_eq!(r.to_string(), "B12");
        assert!(CellRef::parse("12").is_err());
        assert!(CellRef::parse("B0").is_err());
        assert!(CellRef::parse("").is_err());
    }

    #[test]
    fn test_cell_range_parse() {
        let range = CellRange::parse("$B$5:$AK$180").unwrap();
        assert_eq!(range.start, CellRef::new(5, 2));
        assert_eq!(range.end, CellRef::new(180, 37));
        assert_eq!(range.row_count(), 176);
        assert_eq!(range.to_string(), "B5:AK180");
    }
}
