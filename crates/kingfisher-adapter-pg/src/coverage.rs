//! Running coverage statements.

use serde::Serialize;
use serde_json::Value;
use std::io::Write;

use kingfisher_core::{CoreError, CoverageGenerator, CoverageQuery, Table};

use crate::error::PgError;
use crate::Session;

/// What to do with the generated statement.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoverageOptions {
    /// Print the SQL to stdout.
    pub print_sql: bool,
    /// Return the SQL instead of running it.
    pub return_sql: bool,
}

/// Result of [`Session::calculate_coverage`].
#[derive(Debug, Clone)]
pub enum CoverageOutcome {
    Sql(CoverageQuery),
    Report(CoverageReport),
}

/// Coverage percentages for one scope.
///
/// Percentages are `None` when the scope has no rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    pub scope: String,
    pub total: i64,
    /// `(alias, percentage)` in field order.
    pub fields: Vec<(String, Option<f64>)>,
    pub total_percentage: Option<f64>,
    pub warnings: Vec<String>,
}

impl CoverageReport {
    /// Read the single row produced by a coverage statement.
    ///
    /// Columns are read by position: the row count, one percentage per
    /// field, then `total_percentage`. Postgres truncates long column
    /// names, so the names in `table` are not compared.
    pub fn from_table(query: &CoverageQuery, table: &Table) -> Result<Self, PgError> {
        let total_column = query.total_column();
        let expected = query.columns.len() + 2;
        if table.columns.len() != expected || table.rows.iter().any(|row| row.len() != expected) {
            return Err(PgError::Decode {
                column: total_column,
                reason: format!("expected {} columns, got {}", expected, table.columns.len()),
            });
        }
        let row = table.rows.first().ok_or_else(|| PgError::Decode {
            column: total_column.clone(),
            reason: "no rows returned".to_string(),
        })?;

        let total = row[0].as_i64().ok_or_else(|| PgError::Decode {
            column: total_column.clone(),
            reason: "expected an integer row count".to_string(),
        })?;

        let mut fields = Vec::with_capacity(query.columns.len());
        for (column, value) in query.columns.iter().zip(&row[1..expected - 1]) {
            let name = format!("{}_percentage", column.alias);
            fields.push((column.alias.clone(), percentage(value, &name)?));
        }
        let total_percentage = percentage(&row[expected - 1], "total_percentage")?;

        Ok(Self {
            scope: query.scope.clone(),
            total,
            fields,
            total_percentage,
            warnings: query.warnings.clone(),
        })
    }

    pub fn percentage(&self, alias: &str) -> Option<f64> {
        self.fields
            .iter()
            .find(|(name, _)| name == alias)
            .and_then(|(_, value)| *value)
    }
}

fn percentage(value: &Value, column: &str) -> Result<Option<f64>, PgError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) => s.parse().map(Some).map_err(|_| PgError::Decode {
            column: column.to_string(),
            reason: format!("'{}' is not a number", s),
        }),
        other => Err(PgError::Decode {
            column: column.to_string(),
            reason: format!("unexpected value {}", other),
        }),
    }
}

impl Session {
    /// Measure how often `fields` are populated in `scope`.
    ///
    /// The known summary tables are read from the search path. When
    /// `scope` is `None` it is inferred from the first field.
    pub async fn calculate_coverage<S: AsRef<str>>(
        &self,
        fields: &[S],
        scope: Option<&str>,
        options: CoverageOptions,
    ) -> Result<CoverageOutcome, PgError> {
        if fields.is_empty() {
            return Err(CoreError::MissingFields.into());
        }
        let generator = CoverageGenerator::new(self.summary_tables().await?);
        self.calculate_coverage_with(&generator, fields, scope, options)
            .await
    }

    /// Like [`calculate_coverage`](Self::calculate_coverage), with a
    /// caller-built generator (custom root table or array heuristic).
    pub async fn calculate_coverage_with<P, S>(
        &self,
        generator: &CoverageGenerator<P>,
        fields: &[S],
        scope: Option<&str>,
        options: CoverageOptions,
    ) -> Result<CoverageOutcome, PgError>
    where
        P: kingfisher_core::ArraySegmentPredicate,
        S: AsRef<str>,
    {
        self.calculate_coverage_to(generator, fields, scope, options, &mut std::io::stdout())
            .await
    }

    /// Like [`calculate_coverage_with`](Self::calculate_coverage_with),
    /// printing the SQL to `out` instead of stdout.
    pub async fn calculate_coverage_to<P, S, W>(
        &self,
        generator: &CoverageGenerator<P>,
        fields: &[S],
        scope: Option<&str>,
        options: CoverageOptions,
        out: &mut W,
    ) -> Result<CoverageOutcome, PgError>
    where
        P: kingfisher_core::ArraySegmentPredicate,
        S: AsRef<str>,
        W: Write,
    {
        let query = generator.build(fields, scope)?;

        if options.print_sql {
            writeln!(out, "{}", query.sql)?;
            out.flush()?;
        }
        if options.return_sql {
            return Ok(CoverageOutcome::Sql(query));
        }

        let table = self.get_dataframe_from_query(&query.sql, &[]).await?;
        let report = CoverageReport::from_table(&query, &table)?;
        tracing::info!(scope = %report.scope, rows = report.total, "coverage calculated");
        Ok(CoverageOutcome::Report(report))
    }
}
