//! Destination naming for filed reports
//!
//! `<buyer>/CON-<consignment> (<dd-mm-yy>)/<style>, COLOR-<color>, Roll-<rolls>, <fabric_code><ext>`

use crate::error::{Error, Result};
use crate::value::{safe_float_str, CellValue};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::path::PathBuf;

/// Replaces characters that are not allowed in file or folder names.
///
/// Each of `\ / * ? : " < > |` becomes a space, then whitespace runs collapse
/// to one space and the result is trimmed (`"Acme/Co"` -> `"Acme Co"`).
pub fn sanitize_component(name: &str) -> String {
    lazy_static::lazy_static! {
        static ref FORBIDDEN_RE: Regex = Regex::new(r#"[\\/*?:"<>|]"#).unwrap();
        static ref SPACE_RE: Regex = Regex::new(r"\s+").unwrap();
    }

    let replaced = FORBIDDEN_RE.replace_all(name.trim(), " ");
    SPACE_RE.replace_all(&replaced, " ").trim().to_string()
}

/// Integral form of numeric values (`20.0`, `"20"` -> `"20"`); other text is
/// sanitized as-is.
pub fn integral_component(value: &CellValue) -> String {
    match value {
        CellValue::Number(n) => format!("{}", n.trunc() as i64),
        other => {
            let text = other.display_string();
            if text.is_empty() {
                return String::new();
            }
            match text.parse::<f64>() {
                Ok(_) => format!("{}", safe_float_str(&text).trunc() as i64),
                Err(_) => sanitize_component(&text),
            }
        }
    }
}

const TEXT_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y/%m/%d",
    "%d-%b-%Y",
    "%d-%b-%y",
    "%d %b %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%B %d, %Y",
];

const TEXT_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

fn parse_text_date(text: &str) -> Option<NaiveDate> {
    for fmt in TEXT_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt.date());
        }
    }
    TEXT_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Excel 1900-system serial day number to a date.
fn excel_serial_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

/// Inspection date as `dd-mm-yy`; unparseable text is returned sanitized.
pub fn format_report_date(value: &CellValue) -> String {
    let date = match value {
        CellValue::Date(dt) => Some(dt.date()),
        CellValue::Number(n) => excel_serial_date(*n),
        CellValue::Text(s) => parse_text_date(s.trim()),
        _ => None,
    };

    match date {
        Some(d) => d.format("%d-%m-%y").to_string(),
        None => sanitize_component(&value.display_string()),
    }
}

/// Raw identity cells of one report.
#[derive(Debug, Clone, Default)]
pub struct FilingFields {
    pub buyer: CellValue,
    pub supplier: CellValue,
    pub consignment: CellValue,
    pub style: CellValue,
    pub color: CellValue,
    pub rolls: CellValue,
    pub fabric_code: CellValue,
    pub date: CellValue,
}

/// Where a report is filed, relative to the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub buyer_dir: String,
    pub consignment_dir: String,
    pub file_name: String,
}

impl Destination {
    /// Plans the destination; `extension` includes the dot (`".xlsx"`).
    pub fn plan(fields: &FilingFields, extension: &str) -> Result<Self> {
        let buyer = sanitize_component(&fields.buyer.display_string());
        let supplier = sanitize_component(&fields.supplier.display_string());
        let consignment = integral_component(&fields.consignment);

        let missing: Vec<&str> = [
            ("Buyer", &buyer),
            ("Supplier", &supplier),
            ("Consignment", &consignment),
        ]
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| *name)
        .collect();
        if !missing.is_empty() {
            return Err(Error::MissingField(missing.join(", ")));
        }

        let date = format_report_date(&fields.date);
        let consignment_dir = if date.is_empty() {
            format!("CON-{}", consignment)
        } else {
            format!("CON-{} ({})", consignment, date)
        };

        let file_name = format!(
            "{}, COLOR-{}, Roll-{}, {}{}",
            sanitize_component(&fields.style.display_string()),
            sanitize_component(&fields.color.display_string()),
            integral_component(&fields.rolls),
            sanitize_component(&fields.fabric_code.display_string()),
            extension
        );

        Ok(Self {
            buyer_dir: buyer,
            consignment_dir,
            file_name,
        })
    }

    pub fn folder(&self) -> PathBuf {
        PathBuf::from(&self.buyer_dir).join(&self.consignment_dir)
    }

    pub fn relative_path(&self) -> PathBuf {
        self.folder().join(&self.file_name)
    }
}
