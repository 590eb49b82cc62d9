//! Converting result rows to JSON values.

use bigdecimal::BigDecimal;
use serde_json::{json, Value};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo};

use kingfisher_core::Table;

/// Column names of a result row, in select-list order.
pub fn column_names(row: &PgRow) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

/// Convert every column of `row` to JSON.
pub fn row_to_values(row: &PgRow) -> Vec<Value> {
    (0..row.columns().len())
        .map(|index| column_to_json(row, index))
        .collect()
}

/// Collect rows into a [`Table`]. An empty result has no column names.
pub fn rows_to_table(rows: &[PgRow]) -> Table {
    let mut table = Table::new(rows.first().map(column_names).unwrap_or_default());
    for row in rows {
        table.push_row(row_to_values(row));
    }
    table
}

fn column_to_json(row: &PgRow, index: usize) -> Value {
    let type_name = row.columns()[index].type_info().name().to_string();

    let decoded = match type_name.as_str() {
        "INT2" => row.try_get::<Option<i16>, _>(index).map(|v| json!(v)),
        "INT4" => row.try_get::<Option<i32>, _>(index).map(|v| json!(v)),
        "INT8" => row.try_get::<Option<i64>, _>(index).map(|v| json!(v)),
        "FLOAT4" => row.try_get::<Option<f32>, _>(index).map(|v| json!(v)),
        "FLOAT8" => row.try_get::<Option<f64>, _>(index).map(|v| json!(v)),
        "NUMERIC" => row
            .try_get::<Option<BigDecimal>, _>(index)
            .map(|v| v.map(|d| numeric_to_json(&d)).unwrap_or(Value::Null)),
        "BOOL" => row.try_get::<Option<bool>, _>(index).map(|v| json!(v)),
        "JSON" | "JSONB" => row
            .try_get::<Option<Value>, _>(index)
            .map(|v| v.unwrap_or(Value::Null)),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)
            .map(|v| json!(v.map(|t| t.to_rfc3339()))),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)
            .map(|v| json!(v.map(|t| t.to_string()))),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(index)
            .map(|v| json!(v.map(|t| t.to_string()))),
        "TEXT[]" | "VARCHAR[]" => row.try_get::<Option<Vec<String>>, _>(index).map(|v| json!(v)),
        "INT4[]" => row.try_get::<Option<Vec<i32>>, _>(index).map(|v| json!(v)),
        "INT8[]" => row.try_get::<Option<Vec<i64>>, _>(index).map(|v| json!(v)),
        _ => row.try_get::<Option<String>, _>(index).map(|v| json!(v)),
    };

    match decoded {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(
                column = row.columns()[index].name(),
                type_name = %type_name,
                error = %e,
                "column could not be decoded, returning null"
            );
            Value::Null
        }
    }
}

/// Numerics become JSON numbers when they fit, strings otherwise.
fn numeric_to_json(value: &BigDecimal) -> Value {
    let text = value.normalized().to_string();
    match text.parse::<serde_json::Number>() {
        Ok(n) => Value::Number(n),
        Err(_) => Value::String(value.to_string()),
    }
}
