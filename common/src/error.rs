//! Errors raised by the shared decision logic

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Cell address or column letters that do not parse (`"12B"`, `"A0"`)
    #[error("Invalid cell reference: {0}")]
    InvalidCellRef(String),

    /// Filing fields left blank, listed by name
    #[error("Missing required info: {0}")]
    MissingField(String),
}

pub type Result<T> = std::result::Result<T, Error>;
