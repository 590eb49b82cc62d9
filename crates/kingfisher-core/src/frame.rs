//! A small column-ordered result table.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Query results: ordered column names and one JSON value per cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from named columns of equal length.
    ///
    /// Shorter columns are padded with nulls.
    pub fn from_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<Value>)>,
        S: Into<String>,
    {
        let (names, values): (Vec<String>, Vec<Vec<Value>>) = columns
            .into_iter()
            .map(|(name, values)| (name.into(), values))
            .unzip();
        let height = values.iter().map(Vec::len).max().unwrap_or(0);
        let rows = (0..height)
            .map(|i| {
                values
                    .iter()
                    .map(|column| column.get(i).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Self {
            columns: names,
            rows,
        }
    }

    pub fn push_row(&mut self, row: Vec<Value>) {
        self.rows.push(row);
    }

    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    /// The value in the first row and first column.
    pub fn first_cell(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }

    /// Rows as JSON objects keyed by column name.
    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let object: Map<String, Value> = self
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect();
                Value::Object(object)
            })
            .collect()
    }
}

/// Render a cell the way a spreadsheet or CSV shows it: strings unquoted,
/// nulls empty, everything else as JSON.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                cells
                    .iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write_line(f, &self.columns, &widths)?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        writeln!(f, "{}", rule.join("-+-"))?;
        for row in &cells {
            write_line(f, row, &widths)?;
        }
        write!(f, "({} rows)", self.rows.len())
    }
}

fn write_line(f: &mut fmt::Formatter<'_>, values: &[String], widths: &[usize]) -> fmt::Result {
    let padded: Vec<String> = values
        .iter()
        .zip(widths)
        .map(|(value, width)| format!("{:<width$}", value, width = *width))
        .collect();
    writeln!(f, "{}", padded.join(" | ").trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Table {
        Table::from_columns([
            ("col1", vec![json!(1), json!(2)]),
            ("col2", vec![json!(3), json!(4)]),
        ])
    }

    #[test]
    fn test_from_columns() {
        let table = sample();
        assert_eq!(table.columns, vec!["col1", "col2"]);
        assert_eq!(table.rows, vec![vec![json!(1), json!(3)], vec![json!(2), json!(4)]]);
        assert_eq!(table.shape(), (2, 2));
    }

    #[test]
    fn test_from_uneven_columns_pads_nulls() {
        let table = Table::from_columns([("a", vec![json!(1), json!(2)]), ("b", vec![json!("x")])]);
        assert_eq!(table.rows[1], vec![json!(2), Value::Null]);
    }

    #[test]
    fn test_column_and_records() {
        let table = sample();
        assert_eq!(table.column("col2").unwrap(), vec![&json!(3), &json!(4)]);
        assert!(table.column("missing").is_none());
        assert_eq!(table.to_records()[0], json!({"col1": 1, "col2": 3}));
        assert_eq!(table.first_cell(), Some(&json!(1)));
    }

    #[test]
    fn test_empty() {
        let table = Table::new(vec!["id".to_string()]);
        assert!(table.is_empty());
        assert!(table.first_cell().is_none());
    }

    #[test]
    fn test_display() {
        let table = Table::from_columns([
            ("id", vec![json!(1)]),
            ("source_id", vec![json!("scotland")]),
        ]);
        assert_eq!(
            table.to_string(),
            "id | source_id\n---+----------\n1  | scotland\n(1 rows)"
        );
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Value::Null), "");
        assert_eq!(cell_text(&json!("a")), "a");
        assert_eq!(cell_text(&json!(1.5)), "1.5");
        assert_eq!(cell_text(&json!({"a": 1})), "{\"a\":1}");
    }
}
