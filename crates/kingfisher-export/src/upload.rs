//! Uploading flattened workbooks.

use async_trait::async_trait;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use kingfisher_core::{CoreError, Table};

use crate::download::data_to_json;
use crate::error::ExportError;
use crate::flatten::Flattener;

pub const PACKAGE_FILE: &str = "release_package.json";
pub const FLATTENED_FILE: &str = "flattened.xlsx";

/// A file store such as Google Drive.
#[async_trait]
pub trait FileUploader: Send + Sync {
    /// Upload `path` under `title` and return the stored file's ID.
    async fn upload(&self, path: &Path, title: &str) -> Result<String, ExportError>;
}

/// Copies uploads into a local directory. The ID is the copy's path.
#[derive(Debug, Clone)]
pub struct DirectoryUploader {
    dir: PathBuf,
}

impl DirectoryUploader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl FileUploader for DirectoryUploader {
    async fn upload(&self, path: &Path, title: &str) -> Result<String, ExportError> {
        fs::create_dir_all(&self.dir)?;
        let target = self.dir.join(title);
        fs::copy(path, &target)?;
        Ok(target.display().to_string())
    }
}

/// The release package held in the first cell of a query result. A JSON
/// document stored as text is parsed.
fn package_cell(table: &Table) -> Result<Value, ExportError> {
    match table.first_cell() {
        Some(Value::String(text)) => Ok(serde_json::from_str(text)?),
        Some(value) => Ok(value.clone()),
        None => Err(CoreError::EmptyFrame.into()),
    }
}

/// Flatten the release package in the first cell of `table` and upload the
/// workbook as `<name>.xlsx`.
///
/// Intermediate files are written to `work_dir`. Returns the uploaded file's
/// ID, or `None` when the table is empty.
pub async fn save_dataframe_to_spreadsheet(
    table: &Table,
    name: &str,
    work_dir: &Path,
    flattener: &dyn Flattener,
    uploader: &dyn FileUploader,
) -> Result<Option<String>, ExportError> {
    if table.is_empty() {
        println!("Data frame is empty.");
        return Ok(None);
    }

    let package = package_cell(table)?;
    fs::create_dir_all(work_dir)?;
    let input = work_dir.join(PACKAGE_FILE);
    let output = work_dir.join(FLATTENED_FILE);
    fs::write(&input, data_to_json(&package)?)?;

    flattener.flatten(&input, &output)?;

    let id = uploader.upload(&output, &format!("{}.xlsx", name)).await?;
    println!("Uploaded file with ID '{}'", id);
    Ok(Some(id))
}
