//! Error type shared by the library modules.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RectifyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("Failed to open workbook {}: {message}", path.display())]
    Workbook { path: PathBuf, message: String },

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Workbook has no sheets: {}", .0.display())]
    NoSheets(PathBuf),

    #[error("Source table has {columns} columns, at least {required} are required")]
    TableTooNarrow { columns: usize, required: usize },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Cannot decode {} as UTF-8 or GBK", .0.display())]
    Encoding(PathBuf),

    #[error("Invalid document header (expected id-number-name): {0}")]
    InvalidHeader(String),

    #[error("Document is empty")]
    EmptyDocument,

    #[error("Invalid cell reference: {0}")]
    InvalidCellRef(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Excel write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

pub type Result<T> = std::result::Result<T, RectifyError>;
