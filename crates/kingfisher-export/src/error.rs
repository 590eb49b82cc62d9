//! Error types for exports.

use kingfisher_adapter_pg::PgError;
use kingfisher_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("workbook error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("cannot read workbook: {0}")]
    XlsxRead(#[from] calamine::XlsxError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Pg(#[from] PgError),

    /// The spreadsheet service failed.
    #[error("spreadsheet error: {0}")]
    Sheet(String),

    /// A worksheet with this name is already in the spreadsheet.
    #[error("worksheet '{0}' already exists")]
    WorksheetExists(String),
}
