//! CSV, JSON and package downloads.

use serde_json::Value;
use std::path::PathBuf;

use kingfisher_adapter_pg::Session;
use kingfisher_core::frame::cell_text;
use kingfisher_core::Table;

use crate::error::ExportError;
use crate::sink::FileSink;

/// Render a table as CSV with a leading row-number column, the layout
/// pandas writes by default: `,col1,col2` then `0,1,3`.
pub fn dataframe_to_csv(table: &Table) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(std::iter::once("").chain(table.columns.iter().map(String::as_str)))?;
    for (index, row) in table.rows.iter().enumerate() {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(index.to_string());
        record.extend(row.iter().map(cell_text));
        writer.write_record(&record)?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Pretty-printed JSON with a two-space indent. Non-ASCII text is kept as is.
pub fn data_to_json(data: &Value) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(data)?)
}

pub fn download_dataframe_as_csv(
    table: &Table,
    filename: &str,
    sink: &dyn FileSink,
) -> Result<PathBuf, ExportError> {
    let csv = dataframe_to_csv(table)?;
    sink.deliver(filename, csv.as_bytes())
}

pub fn download_data_as_json(data: &Value, filename: &str, sink: &dyn FileSink) -> Result<PathBuf, ExportError> {
    let json = data_to_json(data)?;
    sink.deliver(filename, json.as_bytes())
}

/// Download the releases of one OCID in one collection as a release or
/// record package, named `<ocid>_<type>_package.json`.
pub async fn download_package_from_ocid(
    session: &Session,
    collection_id: i64,
    ocid: &str,
    package_type: &str,
    sink: &dyn FileSink,
) -> Result<PathBuf, ExportError> {
    let (package_type, package) = session.package_for_ocid(collection_id, ocid, package_type).await?;
    download_data_as_json(&package, &package_type.file_name_for_ocid(ocid), sink)
}

/// Download the `data` column of a query as a release or record package,
/// named `<type>_package.json`.
pub async fn download_package_from_query(
    session: &Session,
    sql: &str,
    params: &[Value],
    package_type: &str,
    sink: &dyn FileSink,
) -> Result<PathBuf, ExportError> {
    let (package_type, package) = session.package_from_query(sql, params, package_type).await?;
    download_data_as_json(&package, &package_type.file_name(), sink)
}
