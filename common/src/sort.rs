//! Ledger insertion order
//!
//! Rows are entered buyer first, then consignment number, result text and roll
//! count. String parts compare lexically, numeric parts numerically.

use crate::value::{safe_float, CellValue};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SortKey {
    pub buyer: String,
    pub consignment: u64,
    pub result: String,
    pub rolls: i64,
}

impl SortKey {
    pub fn new(buyer: impl Into<String>, consignment: u64, result: impl Into<String>, rolls: i64) -> Self {
        Self {
            buyer: buyer.into(),
            consignment,
            result: result.into(),
            rolls,
        }
    }

    /// Builds the key from raw cell values.
    pub fn from_cells(
        buyer: &CellValue,
        consignment: &CellValue,
        result: &CellValue,
        rolls: &CellValue,
    ) -> Self {
        Self {
            buyer: buyer.display_string(),
            consignment: consignment_number(&consignment.display_string()),
            result: result.display_string(),
            rolls: safe_float(rolls) as i64,
        }
    }
}

/// All digit runs of a consignment label joined and read as one number
/// (`"CON-12/B3"` -> 123). Labels without digits, or with more digits than
/// fit, give 0.
pub fn consignment_number(label: &str) -> u64 {
    let digits: String = label.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Stable sort by key; equal keys keep their encounter order.
pub fn sort_by_key<T>(items: &mut [T], key: impl Fn(&T) -> &SortKey) {
    items.sort_by(|a, b| key(a).cmp(key(b)));
}
