//! Send/review classification of inspection reports
//!
//! FAIL and REJECTED reports are always emailed. PASS reports are emailed only
//! when one of four checks trips, evaluated in a fixed order:
//! width shortage, length shortage, average point, critical shading.

use crate::types::{PassReportTriggers, SummaryFigures};
use crate::value::{safe_float_str, CellValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// First row of the shading grade block on a page sheet (1-based).
pub const SHADING_FIRST_ROW: u32 = 15;
/// Last row of the shading grade block (inclusive).
pub const SHADING_LAST_ROW: u32 = 17;
/// First column of the first roll group.
pub const ROLL_FIRST_COLUMN: u32 = 2;
/// Columns per roll on a page sheet.
pub const ROLL_COLUMN_SPAN: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Route {
    Send,
    Review,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Send => write!(f, "SEND"),
            Route::Review => write!(f, "REVIEW"),
        }
    }
}

/// Routing decision plus a human-readable reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub route: Route,
    pub reason: String,
}

impl Decision {
    pub fn send(reason: impl Into<String>) -> Self {
        Self {
            route: Route::Send,
            reason: reason.into(),
        }
    }

    pub fn review(reason: impl Into<String>) -> Self {
        Self {
            route: Route::Review,
            reason: reason.into(),
        }
    }

    pub fn is_send(&self) -> bool {
        self.route == Route::Send
    }
}

/// `true` for result texts containing "fail" or "rejected" (any case).
pub fn is_fail_result(result_text: &str) -> bool {
    let lower = result_text.to_lowercase();
    lower.contains("fail") || lower.contains("rejected")
}

pub fn is_pass_result(result_text: &str) -> bool {
    result_text.to_lowercase().contains("pass")
}

/// Classifies one report.
pub fn classify(
    result_text: &str,
    figures: &SummaryFigures,
    triggers: &PassReportTriggers,
) -> Decision {
    if is_fail_result(result_text) {
        return Decision::send(format!("Result is {}", result_text.trim().to_uppercase()));
    }

    if !is_pass_result(result_text) {
        return Decision::review(format!(
            "Unrecognised result '{}'",
            result_text.trim()
        ));
    }

    if let Some(reason) = pass_report_trigger(figures, triggers) {
        return Decision::send(reason);
    }

    Decision::review("Standard PASS report")
}

/// Runs the PASS checks in order and returns the first reason that trips.
fn pass_report_trigger(figures: &SummaryFigures, triggers: &PassReportTriggers) -> Option<String> {
    // Width shortage
    let width_diff = figures.order_width - figures.actual_width;
    if figures.actual_width > 0.0
        && figures.order_width > 0.0
        && width_diff > triggers.width_shortage_tolerance_inch
    {
        return Some(format!(
            "Width shortage > {}\"",
            triggers.width_shortage_tolerance_inch
        ));
    }

    // Length shortage
    if figures.ticked_yards > 0.0 && figures.total_short_excess < 0.0 {
        let length_percent = figures.total_short_excess.abs() / figures.ticked_yards * 100.0;
        if length_percent >= triggers.length_shortage_percentage {
            return Some(format!(
                "Length shortage >= {}%",
                triggers.length_shortage_percentage
            ));
        }
    }

    // Average point
    if figures.avg_point >= triggers.avg_point_threshold {
        return Some(format!(
            "Avg point {} >= threshold {}",
            figures.avg_point, triggers.avg_point_threshold
        ));
    }

    // Critical shading
    if figures.check_roll > 0 {
        let shading_percent =
            f64::from(figures.critical_shade_rolls) / figures.check_roll as f64 * 100.0;
        if shading_percent >= triggers.shading_percentage_threshold {
            return Some(format!(
                "Critical shading >= {}%",
                triggers.shading_percentage_threshold
            ));
        }
    }

    None
}

/// Shading grade criticality.
///
/// `"3/5"` style grades compare the part before the slash with `< 4`; bare
/// grades compare the whole value with `<= 4`. Blank cells are never critical.
pub fn is_critical_shading(value: &CellValue) -> bool {
    match value {
        CellValue::Empty => false,
        CellValue::Number(n) => *n <= 4.0,
        other => {
            let text = other.display_string();
            if text.is_empty() {
                return false;
            }
            match text.split_once('/') {
                Some((first, _)) => safe_float_str(first) < 4.0,
                None => safe_float_str(&text) <= 4.0,
            }
        }
    }
}

/// Shading grade rows of one visible page sheet.
#[derive(Debug, Clone, Default)]
pub struct ShadingGrid {
    /// Last used column of the sheet (1-based)
    pub last_col: u32,
    /// Rows 15..=17, each indexed by `column - 1`
    pub rows: Vec<Vec<CellValue>>,
}

impl ShadingGrid {
    pub fn new(last_col: u32, rows: Vec<Vec<CellValue>>) -> Self {
        Self { last_col, rows }
    }

    fn cell(&self, row_offset: usize, col: u32) -> Option<&CellValue> {
        self.rows
            .get(row_offset)
            .and_then(|row| row.get((col - 1) as usize))
    }

    /// Counts roll groups (4 columns wide, starting at column 2) holding
    /// at least one critical grade.
    pub fn critical_rolls(&self) -> u32 {
        let mut critical = 0;
        let mut group_start = ROLL_FIRST_COLUMN;

        while group_start <= self.last_col {
            let group_end = (group_start + ROLL_COLUMN_SPAN - 1).min(self.last_col);
            let is_critical = (group_start..=group_end).any(|col| {
                (0..self.rows.len())
                    .any(|offset| self.cell(offset, col).is_some_and(is_critical_shading))
            });
            if is_critical {
                critical += 1;
            }
            group_start += ROLL_COLUMN_SPAN;
        }

        critical
    }
}

/// Critical roll count across every visible page sheet.
pub fn count_critical_rolls(grids: &[ShadingGrid]) -> u32 {
    grids.iter().map(ShadingGrid::critical_rolls).sum()
}
