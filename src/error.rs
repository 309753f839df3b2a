use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QcError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration file '{0}' not found")]
    ConfigNotFound(PathBuf),

    #[error("JSON syntax error in configuration: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::XlsxError),

    #[error("Sheet '{sheet}' not found in {file}")]
    SheetNotFound { file: String, sheet: String },

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Workbook package error: {0}")]
    Package(String),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML parse error: {0}")]
    XmlParse(#[from] roxmltree::Error),

    #[error("Could not write cell {cell}: {reason}")]
    CellWrite { cell: String, reason: String },

    #[error("Mail client unavailable: {0}")]
    MailClientUnavailable(String),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error(transparent)]
    Common(#[from] qc_automation_common::Error),
}

pub type Result<T> = std::result::Result<T, QcError>;
