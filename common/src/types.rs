//! Shared types
//!
//! - PassReportTriggers: thresholds that promote a PASS report to an email
//! - SummaryFigures: the measured quantities the classifier looks at

use serde::{Deserialize, Serialize};

/// Thresholds under `email_filter_rules.pass_report_triggers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassReportTriggers {
    pub width_shortage_tolerance_inch: f64,
    pub length_shortage_percentage: f64,
    pub avg_point_threshold: f64,
    pub shading_percentage_threshold: f64,
}

impl Default for PassReportTriggers {
    fn default() -> Self {
        Self {
            width_shortage_tolerance_inch: 0.5,
            length_shortage_percentage: 0.5,
            avg_point_threshold: 10.0,
            shading_percentage_threshold: 15.0,
        }
    }
}

/// Summary-sheet figures of one report, already coerced to numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryFigures {
    pub order_width: f64,
    pub actual_width: f64,
    pub ticked_yards: f64,
    pub total_short_excess: f64,
    pub avg_point: f64,
    /// Number of rolls checked
    pub check_roll: i64,
    /// Rolls with at least one critical shading grade on a visible page sheet
    pub critical_shade_rolls: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triggers_defaults_fill_missing_keys() {
        let triggers: PassReportTriggers =
            serde_json::from_str(r#"{"avg_point_threshold": 12}"#).unwrap();
        assert_eq!(triggers.avg_point_threshold, 12.0);
        assert_eq!(triggers.width_shortage_tolerance_inch, 0.5);
        assert_eq!(triggers.length_shortage_percentage, 0.5);
        assert_eq!(triggers.shading_percentage_threshold, 15.0);
    }
}
