//! QC Automation Common Library
//!
//! Decision logic shared by the ledger, email and filing tasks. Nothing here
//! touches a workbook or the file system, so all of it is unit-testable.

pub mod classifier;
pub mod email;
pub mod error;
pub mod naming;
pub mod sort;
pub mod types;
pub mod value;

pub use classifier::{classify, count_critical_rolls, is_critical_shading, Decision, Route, ShadingGrid};
pub use email::{compose_html_body, compose_subject, DraftLine};
pub use error::{Error, Result};
pub use naming::{sanitize_component, Destination, FilingFields};
pub use sort::{sort_by_key, SortKey};
pub use types::{PassReportTriggers, SummaryFigures};
pub use value::{safe_float, CellRange, CellRef, CellValue};
