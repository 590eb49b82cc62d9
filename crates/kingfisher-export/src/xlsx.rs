//! Cell writing shared by the workbook writers.

use rust_xlsxwriter::{Worksheet, XlsxError};
use serde_json::Value;

use crate::error::ExportError;

/// Excel's limit on worksheet name length.
pub const MAX_SHEET_NAME: usize = 31;

pub(crate) fn write_value(worksheet: &mut Worksheet, row: u32, col: u16, value: &Value) -> Result<(), XlsxError> {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        Value::Number(n) => match n.as_f64() {
            Some(f) => {
                worksheet.write_number(row, col, f)?;
            }
            None => {
                worksheet.write_string(row, col, n.to_string())?;
            }
        },
        Value::String(s) => {
            worksheet.write_string(row, col, s)?;
        }
        other => {
            worksheet.write_string(row, col, other.to_string())?;
        }
    }
    Ok(())
}

/// Zero-based row and column as worksheet coordinates.
pub(crate) fn cell_index(row: usize, col: usize) -> Result<(u32, u16), ExportError> {
    let r = u32::try_from(row).map_err(|_| ExportError::Sheet(format!("row {} is out of range", row)))?;
    let c = u16::try_from(col).map_err(|_| ExportError::Sheet(format!("column {} is out of range", col)))?;
    Ok((r, c))
}

pub(crate) fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<Value>]) -> Result<(), ExportError> {
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            let (r, c) = cell_index(r, c)?;
            write_value(worksheet, r, c, value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use serde_json::json;

    #[test]
    fn test_cell_index_in_range() {
        assert_eq!(cell_index(0, 0).unwrap(), (0, 0));
        assert_eq!(cell_index(1_048_575, 16_383).unwrap(), (1_048_575, 16_383));
    }

    #[test]
    fn test_cell_index_column_overflow() {
        let err = cell_index(0, 70_000).unwrap_err();
        assert!(matches!(err, ExportError::Sheet(ref message) if message == "column 70000 is out of range"));
    }

    #[test]
    fn test_write_rows_refuses_wide_row() {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        let row = vec![json!(1); usize::from(u16::MAX) + 2];
        let result = write_rows(worksheet, &[row]);
        assert!(result.is_err());
    }
}
