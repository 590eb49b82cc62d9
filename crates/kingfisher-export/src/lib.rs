//! # kingfisher-export
//!
//! Getting query results out of Kingfisher Colab: CSV and JSON files,
//! OCDS release and record packages, worksheets in a named spreadsheet and
//! flattened workbooks.
//!
//! The services a notebook talks to (browser downloads, Google Sheets,
//! Google Drive, interactive input) are traits here. Each has a local
//! implementation that works on the filesystem:
//!
//! | Trait | Local implementation |
//! |-------|----------------------|
//! | [`FileSink`] | [`DirectorySink`] |
//! | [`SpreadsheetClient`] | [`XlsxSpreadsheetClient`] |
//! | [`Prompt`] | [`StdinPrompt`] |
//! | [`FileUploader`] | [`DirectoryUploader`] |
//! | [`Flattener`] | [`XlsxFlattener`] |

pub mod download;
pub mod error;
pub mod flatten;
pub mod prompt;
pub mod sheets;
pub mod sink;
pub mod upload;
mod xlsx;

pub use download::{
    download_data_as_json, download_dataframe_as_csv, download_package_from_ocid, download_package_from_query,
};
pub use error::ExportError;
pub use flatten::{Flattener, XlsxFlattener};
pub use prompt::{Prompt, StdinPrompt};
pub use sheets::{save_straight_to_sheets, save_to_sheets, SpreadsheetClient, XlsxSpreadsheetClient};
pub use sink::{DirectorySink, FileSink};
pub use upload::{save_dataframe_to_spreadsheet, DirectoryUploader, FileUploader};
