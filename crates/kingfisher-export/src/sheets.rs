//! Saving tables as worksheets of a named spreadsheet.

use async_trait::async_trait;
use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::Workbook;
use serde_json::{Number, Value};
use std::path::{Path, PathBuf};

use kingfisher_core::Table;

use crate::error::ExportError;
use crate::prompt::Prompt;
use crate::xlsx;

pub const SAVE_PROMPT: &str = "Save to Google Sheets? (y/N)";

/// A spreadsheet service such as Google Sheets.
#[async_trait]
pub trait SpreadsheetClient: Send {
    /// Open the spreadsheet called `name`, creating it if it does not exist.
    async fn open_or_create(&mut self, name: &str) -> Result<(), ExportError>;

    /// Add an empty worksheet sized `rows` x `cols`.
    ///
    /// Returns [`ExportError::WorksheetExists`] when the title is taken.
    async fn add_worksheet(&mut self, title: &str, rows: usize, cols: usize) -> Result<(), ExportError>;

    /// Replace the contents of a worksheet.
    async fn write_rows(&mut self, title: &str, rows: Vec<Vec<Value>>) -> Result<(), ExportError>;
}

fn collision_prompt(sheet_name: &str) -> String {
    format!("{} already exists, enter a new name:", sheet_name)
}

/// Header row followed by the data rows, without the row-number column.
fn sheet_rows(table: &Table) -> Vec<Vec<Value>> {
    let header = table.columns.iter().map(|c| Value::String(c.clone())).collect();
    std::iter::once(header).chain(table.rows.iter().cloned()).collect()
}

/// Add `table` to the spreadsheet as a new worksheet.
///
/// If `sheet_name` is taken the user is asked once for another name. Returns
/// the name the worksheet was saved under.
pub async fn save_straight_to_sheets(
    table: &Table,
    spreadsheet_name: &str,
    sheet_name: &str,
    client: &mut dyn SpreadsheetClient,
    prompt: &dyn Prompt,
) -> Result<String, ExportError> {
    client.open_or_create(spreadsheet_name).await?;

    let (rows, cols) = table.shape();
    let title = match client.add_worksheet(sheet_name, rows, cols).await {
        Ok(()) => sheet_name.to_string(),
        Err(ExportError::WorksheetExists(_)) => {
            tracing::warn!(sheet = sheet_name, "worksheet already exists");
            let renamed = prompt.ask(&collision_prompt(sheet_name))?;
            client.add_worksheet(&renamed, rows, cols).await?;
            renamed
        }
        Err(e) => return Err(e),
    };

    client.write_rows(&title, sheet_rows(table)).await?;
    tracing::info!(spreadsheet = spreadsheet_name, sheet = %title, rows, "worksheet saved");
    Ok(title)
}

/// Like [`save_straight_to_sheets`], after the user answers `y` to
/// [`SAVE_PROMPT`]. Returns `None` when the user declines.
pub async fn save_to_sheets(
    table: &Table,
    spreadsheet_name: &str,
    sheet_name: &str,
    client: &mut dyn SpreadsheetClient,
    prompt: &dyn Prompt,
) -> Result<Option<String>, ExportError> {
    if prompt.ask(SAVE_PROMPT)? != "y" {
        return Ok(None);
    }
    save_straight_to_sheets(table, spreadsheet_name, sheet_name, client, prompt)
        .await
        .map(Some)
}

/// Keeps spreadsheets as `.xlsx` workbooks in a local directory.
///
/// Opening a spreadsheet reads the worksheets already saved in
/// `<dir>/<spreadsheet>.xlsx`; the whole workbook is rewritten after every
/// write.
#[derive(Debug)]
pub struct XlsxSpreadsheetClient {
    dir: PathBuf,
    spreadsheet: Option<String>,
    sheets: Vec<(String, Vec<Vec<Value>>)>,
}

impl XlsxSpreadsheetClient {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            spreadsheet: None,
            sheets: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the open spreadsheet's workbook.
    pub fn path(&self) -> Option<PathBuf> {
        self.spreadsheet
            .as_ref()
            .map(|name| self.dir.join(format!("{}.xlsx", name)))
    }

    pub fn worksheet_titles(&self) -> Vec<&str> {
        self.sheets.iter().map(|(title, _)| title.as_str()).collect()
    }

    /// Cells of the worksheet called `title`.
    pub fn rows(&self, title: &str) -> Option<&[Vec<Value>]> {
        self.sheets
            .iter()
            .find(|(t, _)| t == title)
            .map(|(_, rows)| rows.as_slice())
    }

    fn load(path: &Path) -> Result<Vec<(String, Vec<Vec<Value>>)>, ExportError> {
        let mut workbook: Xlsx<_> = open_workbook(path)?;
        let mut sheets = Vec::new();
        for title in workbook.sheet_names() {
            let range = workbook.worksheet_range(&title)?;
            let (top, left) = range.start().unwrap_or((0, 0));
            let mut rows: Vec<Vec<Value>> = (0..top).map(|_| Vec::new()).collect();
            for row in range.rows() {
                let padding = std::iter::repeat_n(Value::Null, left as usize);
                rows.push(padding.chain(row.iter().map(cell_value)).collect());
            }
            sheets.push((title, rows));
        }
        Ok(sheets)
    }

    fn save(&self) -> Result<PathBuf, ExportError> {
        let path = self
            .path()
            .ok_or_else(|| ExportError::Sheet("no spreadsheet is open".to_string()))?;
        std::fs::create_dir_all(&self.dir)?;

        let mut workbook = Workbook::new();
        for (title, rows) in &self.sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(title)?;
            xlsx::write_rows(worksheet, rows)?;
        }
        workbook.save(&path)?;
        Ok(path)
    }
}

#[async_trait]
impl SpreadsheetClient for XlsxSpreadsheetClient {
    async fn open_or_create(&mut self, name: &str) -> Result<(), ExportError> {
        if self.spreadsheet.as_deref() == Some(name) {
            return Ok(());
        }
        let path = self.dir.join(format!("{}.xlsx", name));
        self.sheets = if path.exists() {
            let sheets = Self::load(&path)?;
            tracing::debug!(path = %path.display(), sheets = sheets.len(), "spreadsheet opened");
            sheets
        } else {
            Vec::new()
        };
        self.spreadsheet = Some(name.to_string());
        Ok(())
    }

    async fn add_worksheet(&mut self, title: &str, rows: usize, cols: usize) -> Result<(), ExportError> {
        if self.spreadsheet.is_none() {
            return Err(ExportError::Sheet("no spreadsheet is open".to_string()));
        }
        // Excel compares worksheet names case-insensitively.
        if self.sheets.iter().any(|(t, _)| t.eq_ignore_ascii_case(title)) {
            return Err(ExportError::WorksheetExists(title.to_string()));
        }
        if title.is_empty() || title.chars().count() > xlsx::MAX_SHEET_NAME {
            return Err(ExportError::Sheet(format!(
                "worksheet name '{}' must be 1 to {} characters",
                title,
                xlsx::MAX_SHEET_NAME
            )));
        }
        tracing::debug!(title, rows, cols, "worksheet added");
        self.sheets.push((title.to_string(), Vec::new()));
        Ok(())
    }

    async fn write_rows(&mut self, title: &str, rows: Vec<Vec<Value>>) -> Result<(), ExportError> {
        let sheet = self
            .sheets
            .iter_mut()
            .find(|(t, _)| t == title)
            .ok_or_else(|| ExportError::Sheet(format!("no worksheet named '{}'", title)))?;
        sheet.1 = rows;
        self.save()?;
        Ok(())
    }
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::Int(i) => Value::from(*i),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Value::from(*f as i64),
        Data::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    }
}
