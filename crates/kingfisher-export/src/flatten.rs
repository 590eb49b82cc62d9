//! Flattening release packages into spreadsheet workbooks.
//!
//! Each release becomes one row of the `releases` sheet. Nested objects
//! become slash-separated columns (`tender/title`); arrays of objects get a
//! sheet of their own (`awards`, `awards_items`) whose rows carry the
//! release's `ocid` and `id` plus the `id` of every enclosing array item.
//! Arrays of plain values are joined with `;` into one cell.

use rust_xlsxwriter::{DocProperties, Workbook};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use kingfisher_core::frame::cell_text;

use crate::error::ExportError;
use crate::xlsx;

pub const MAIN_SHEET: &str = "releases";

/// Turns a release package file into a workbook file.
pub trait Flattener: Send + Sync {
    fn flatten(&self, input: &Path, output: &Path) -> Result<(), ExportError>;
}

/// One sheet of a flattened package.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatSheet {
    pub name: String,
    /// Slash path of the array this sheet holds, empty for the main sheet.
    pub path: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

type Cells = Vec<(String, Value)>;

struct SheetBuilder {
    path: String,
    columns: Vec<String>,
    rows: Vec<Cells>,
}

#[derive(Default)]
struct Builder {
    sheets: Vec<SheetBuilder>,
}

impl Builder {
    fn sheet(&mut self, path: &str) -> &mut SheetBuilder {
        let index = match self.sheets.iter().position(|s| s.path == path) {
            Some(index) => index,
            None => {
                self.sheets.push(SheetBuilder {
                    path: path.to_string(),
                    columns: Vec::new(),
                    rows: Vec::new(),
                });
                self.sheets.len() - 1
            }
        };
        &mut self.sheets[index]
    }

    fn add_row(&mut self, path: &str, cells: Cells) {
        let sheet = self.sheet(path);
        for (column, _) in &cells {
            if !sheet.columns.contains(column) {
                sheet.columns.push(column.clone());
            }
        }
        sheet.rows.push(cells);
    }

    fn flatten_object(
        &mut self,
        object: &Map<String, Value>,
        column_prefix: &str,
        path_prefix: &str,
        cells: &mut Cells,
        context: &Cells,
    ) {
        for (key, value) in object {
            let column = format!("{}{}", column_prefix, key);
            match value {
                Value::Object(inner) => {
                    self.flatten_object(
                        inner,
                        &format!("{}/", column),
                        &format!("{}{}/", path_prefix, key),
                        cells,
                        context,
                    );
                }
                Value::Array(items) if items.is_empty() => {}
                Value::Array(items) if items.iter().all(Value::is_object) => {
                    let path = format!("{}{}", path_prefix, key);
                    self.flatten_array(items, &path, context);
                }
                Value::Array(items) => {
                    let joined = items.iter().map(cell_text).collect::<Vec<_>>().join(";");
                    cells.push((column, Value::String(joined)));
                }
                scalar => cells.push((column, scalar.clone())),
            }
        }
    }

    fn flatten_array(&mut self, items: &[Value], path: &str, context: &Cells) {
        // Registered before any nested sheet so sheets come out parent first.
        self.sheet(path);
        let column_prefix = format!("{}/0/", path);

        for item in items {
            let Value::Object(object) = item else { continue };

            let mut child_context = context.clone();
            if let Some(id) = object.get("id") {
                child_context.push((format!("{}id", column_prefix), id.clone()));
            }

            let mut cells = context.clone();
            self.flatten_object(object, &column_prefix, &format!("{}/", path), &mut cells, &child_context);
            self.add_row(path, cells);
        }
    }

    fn finish(self) -> Vec<FlatSheet> {
        let mut names: Vec<String> = Vec::new();
        self.sheets
            .into_iter()
            .map(|sheet| {
                let name = sheet_name(&sheet.path, &names);
                names.push(name.clone());
                let rows = sheet
                    .rows
                    .into_iter()
                    .map(|cells| {
                        let mut row = vec![Value::Null; sheet.columns.len()];
                        for (column, value) in cells {
                            if let Some(index) = sheet.columns.iter().position(|c| *c == column) {
                                row[index] = value;
                            }
                        }
                        row
                    })
                    .collect();
                FlatSheet {
                    name,
                    path: sheet.path,
                    columns: sheet.columns,
                    rows,
                }
            })
            .collect()
    }
}

/// `releases` for the main sheet, otherwise the path with `_` for `/`,
/// cut to Excel's limit and made unique.
fn sheet_name(path: &str, taken: &[String]) -> String {
    let base: String = if path.is_empty() {
        MAIN_SHEET.to_string()
    } else {
        path.replace('/', "_").chars().take(xlsx::MAX_SHEET_NAME).collect()
    };
    let is_taken = |name: &str| taken.iter().any(|t| t.eq_ignore_ascii_case(name));
    if !is_taken(&base) {
        return base;
    }
    (2..)
        .map(|n| {
            let suffix = format!("_{}", n);
            let keep = xlsx::MAX_SHEET_NAME - suffix.len();
            format!("{}{}", base.chars().take(keep).collect::<String>(), suffix)
        })
        .find(|name| !is_taken(name))
        .unwrap_or_else(|| base.clone())
}

/// Flatten the releases of a release package into sheets, main sheet first.
pub fn flatten_releases(releases: &[Value]) -> Vec<FlatSheet> {
    let mut builder = Builder::default();
    builder.sheet("");

    for release in releases {
        let Value::Object(object) = release else {
            tracing::warn!("skipping release that is not a JSON object");
            continue;
        };
        let context: Cells = ["ocid", "id"]
            .into_iter()
            .filter_map(|key| object.get(key).map(|v| (key.to_string(), v.clone())))
            .collect();

        let mut cells = Vec::new();
        builder.flatten_object(object, "", "", &mut cells, &context);
        builder.add_row("", cells);
    }

    builder.finish()
}

/// The releases of a package: `releases`, or the releases of each record.
pub fn package_releases(package: &Value) -> Vec<Value> {
    if let Some(releases) = package.get("releases").and_then(Value::as_array) {
        return releases.clone();
    }
    package
        .get("records")
        .and_then(Value::as_array)
        .map(|records| {
            records
                .iter()
                .filter_map(|record| record.get("releases").and_then(Value::as_array))
                .flatten()
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Writes flattened sheets with `rust_xlsxwriter`.
#[derive(Debug, Clone)]
pub struct XlsxFlattener {
    schema_url: String,
}

impl XlsxFlattener {
    pub fn new(schema_url: impl Into<String>) -> Self {
        Self {
            schema_url: schema_url.into(),
        }
    }

    pub fn schema_url(&self) -> &str {
        &self.schema_url
    }

    pub fn write_workbook(&self, sheets: &[FlatSheet], output: &Path) -> Result<(), ExportError> {
        let mut workbook = Workbook::new();
        let properties = DocProperties::new()
            .set_title("Flattened release package")
            .set_comment(&format!("Release schema: {}", self.schema_url));
        workbook.set_properties(&properties);

        for sheet in sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&sheet.name)?;
            let header: Vec<Value> = sheet.columns.iter().map(|c| Value::String(c.clone())).collect();
            xlsx::write_rows(worksheet, std::slice::from_ref(&header))?;
            for (r, row) in sheet.rows.iter().enumerate() {
                for (c, value) in row.iter().enumerate() {
                    let (r, c) = xlsx::cell_index(r + 1, c)?;
                    xlsx::write_value(worksheet, r, c, value)?;
                }
            }
        }

        workbook.save(output)?;
        Ok(())
    }
}

impl Flattener for XlsxFlattener {
    fn flatten(&self, input: &Path, output: &Path) -> Result<(), ExportError> {
        let package: Value = serde_json::from_str(&fs::read_to_string(input)?)?;
        let sheets = flatten_releases(&package_releases(&package));
        self.write_workbook(&sheets, output)?;
        tracing::info!(
            input = %input.display(),
            output = %output.display(),
            sheets = sheets.len(),
            "package flattened"
        );
        Ok(())
    }
}
