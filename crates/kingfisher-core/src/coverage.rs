//! Coverage SQL generation.
//!
//! Coverage is the percentage of rows in a summary table (the *scope*) in
//! which a field is populated. Summary tables are produced by Kingfisher
//! Summarize: one row per object (release, award, contract item, ...), each
//! with a `field_list` jsonb column mapping every populated JSON pointer to
//! its number of occurrences.
//!
//! Given `["awards/date", "ALL :items/description"]` and scope
//! `awards_summary`, the generator emits one `ROUND(...)` column per field
//! plus a `total_percentage` column for rows where every field is present:
//!
//! ```sql
//! SELECT
//!     count(*) AS total_awards_summary,
//!     ROUND(SUM(CASE WHEN awards_summary.field_list ? 'date' THEN 1 ELSE 0 END) * 100.0 / NULLIF(count(*), 0), 2) AS awards_date_percentage,
//!     ...
//! FROM awards_summary
//! ```
//!
//! Table names and pointers are interpolated into the SQL text. Pointers are
//! restricted to identifier characters by [`crate::pointer`], and table names
//! only ever come from the caller's scope or the known summary-table set, so
//! the generator must only be fed by the notebook author, never by end users.

use std::collections::BTreeSet;

use crate::error::CoreError;
use crate::pointer::{validate_identifier, FieldSpec, Mode, Pointer};

/// Summary table with one row per compiled release.
pub const ROOT_TABLE: &str = "release_summary";

const SUMMARY_SUFFIX: &str = "_summary";

/// Plural segments that are abbreviated when they prefix a longer table name,
/// e.g. `awards/items` lives in `award_items_summary`.
const ABBREVIATIONS: &[(&str, &str)] = &[("awards", "award"), ("contracts", "contract")];

/// Decides whether a pointer segment names a one-to-many array.
///
/// The default, [`PluralSegment`], is a naming heuristic; a schema-aware
/// implementation can be swapped in without touching the generator.
pub trait ArraySegmentPredicate {
    fn is_array_segment(&self, segment: &str) -> bool;
}

impl<F> ArraySegmentPredicate for F
where
    F: Fn(&str) -> bool,
{
    fn is_array_segment(&self, segment: &str) -> bool {
        self(segment)
    }
}

/// Any segment ending in `s`, except `address`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PluralSegment;

impl ArraySegmentPredicate for PluralSegment {
    fn is_array_segment(&self, segment: &str) -> bool {
        segment.ends_with('s') && segment != "address"
    }
}

/// A presence test for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub sql: String,
    /// Set when the result may be inaccurate.
    pub warning: Option<String>,
}

/// One per-field column of the coverage query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageColumn {
    pub alias: String,
    pub table: String,
    pub pointer: String,
    pub mode: Mode,
    pub condition: String,
}

/// A generated coverage statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageQuery {
    pub sql: String,
    pub scope: String,
    pub columns: Vec<CoverageColumn>,
    pub warnings: Vec<String>,
}

impl CoverageQuery {
    /// Name of the row-count column.
    pub fn total_column(&self) -> String {
        format!("total_{}", self.scope)
    }
}

/// Map a pointer to the summary table that holds it and the pointer
/// relative to that table.
///
/// Relative pointers (`:x`) always resolve to `scope`. Absolute pointers are
/// matched against `tables` from the longest prefix to the shortest; when
/// nothing matches the pointer belongs to `root_table` unchanged.
pub fn get_table_and_pointer(
    tables: &BTreeSet<String>,
    scope: &str,
    root_table: &str,
    pointer: &Pointer,
) -> (String, String) {
    let path = match pointer {
        Pointer::Relative(path) => return (scope.to_string(), path.clone()),
        Pointer::Absolute(path) => path,
    };

    let parts: Vec<&str> = path.split('/').collect();
    for num in (1..parts.len()).rev() {
        let table = summary_table_name(&parts[..num]);
        if tables.contains(&table) {
            return (table, parts[num..].join("/"));
        }
    }

    (root_table.to_string(), path.clone())
}

fn summary_table_name(prefix: &[&str]) -> String {
    let last = prefix.len() - 1;
    let mut name = prefix
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            let segment = segment.to_lowercase();
            if i < last {
                ABBREVIATIONS
                    .iter()
                    .find(|(plural, _)| *plural == segment)
                    .map(|(_, singular)| singular.to_string())
                    .unwrap_or(segment)
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("_");
    name.push_str(SUMMARY_SUFFIX);
    name
}

/// Build the presence test for `pointer` in `table`.
///
/// In [`Mode::All`] the occurrence count of the pointer is compared with the
/// count of its innermost enclosing array: equal counts mean the field is
/// present in every element. `relative` marks pointers written against the
/// scope table, whose rows are themselves array elements; such a pointer
/// with no array of its own is compared with itself.
pub fn get_condition(
    table: &str,
    pointer: &str,
    mode: Mode,
    relative: bool,
    predicate: &dyn ArraySegmentPredicate,
) -> Condition {
    let any = Condition {
        sql: format!("{}.field_list ? '{}'", table, pointer),
        warning: None,
    };
    if mode == Mode::Any {
        return any;
    }

    let parts: Vec<&str> = pointer.split('/').collect();
    let arrays: Vec<usize> = parts[..parts.len() - 1]
        .iter()
        .enumerate()
        .filter(|(_, segment)| predicate.is_array_segment(segment))
        .map(|(i, _)| i)
        .collect();

    let anchor = match arrays.last() {
        Some(&innermost) => parts[..=innermost].join("/"),
        None if relative => pointer.to_string(),
        None => return any,
    };

    let warning = (arrays.len() > 1).then(|| {
        format!(
            "{} is nested in {} arrays; ALL coverage compares against the innermost array only and may be inaccurate",
            pointer,
            arrays.len()
        )
    });

    Condition {
        sql: format!(
            "coalesce({table}.field_list->>'{pointer}' = {table}.field_list->>'{anchor}', false)"
        ),
        warning,
    }
}

/// Builds coverage statements against a known set of summary tables.
pub struct CoverageGenerator<P = PluralSegment> {
    tables: BTreeSet<String>,
    root_table: String,
    predicate: P,
}

impl CoverageGenerator<PluralSegment> {
    pub fn new<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tables: tables.into_iter().map(Into::into).collect(),
            root_table: ROOT_TABLE.to_string(),
            predicate: PluralSegment,
        }
    }
}

impl<P: ArraySegmentPredicate> CoverageGenerator<P> {
    pub fn with_root_table(mut self, root_table: impl Into<String>) -> Self {
        self.root_table = root_table.into();
        self
    }

    /// Replace the array-segment heuristic.
    pub fn with_predicate<Q: ArraySegmentPredicate>(self, predicate: Q) -> CoverageGenerator<Q> {
        CoverageGenerator {
            tables: self.tables,
            root_table: self.root_table,
            predicate,
        }
    }

    pub fn tables(&self) -> &BTreeSet<String> {
        &self.tables
    }

    pub fn root_table(&self) -> &str {
        &self.root_table
    }

    /// Resolve a pointer against this generator's tables.
    pub fn table_and_pointer(&self, scope: &str, pointer: &Pointer) -> (String, String) {
        get_table_and_pointer(&self.tables, scope, &self.root_table, pointer)
    }

    /// The scope used when the caller gives none: the most specific summary
    /// table holding the first field.
    pub fn infer_scope(&self, first: &FieldSpec) -> String {
        self.table_and_pointer(&self.root_table, &first.pointer).0
    }

    /// Parse `fields` and build the coverage statement.
    pub fn build<S: AsRef<str>>(
        &self,
        fields: &[S],
        scope: Option<&str>,
    ) -> Result<CoverageQuery, CoreError> {
        let specs = fields
            .iter()
            .map(|field| field.as_ref().parse::<FieldSpec>())
            .collect::<Result<Vec<_>, _>>()?;
        self.build_from_specs(&specs, scope)
    }

    pub fn build_from_specs(
        &self,
        fields: &[FieldSpec],
        scope: Option<&str>,
    ) -> Result<CoverageQuery, CoreError> {
        let first = fields.first().ok_or(CoreError::MissingFields)?;
        let scope = match scope {
            Some(scope) => scope.to_string(),
            None => self.infer_scope(first),
        };
        validate_identifier(&scope)?;
        validate_identifier(&self.root_table)?;
        if !self.tables.is_empty() && !self.tables.contains(&scope) {
            tracing::warn!(scope = %scope, "scope is not a known summary table");
        }

        let mut columns: Vec<CoverageColumn> = Vec::new();
        let mut warnings = Vec::new();
        let mut join = false;

        for field in fields {
            let (mut table, mut pointer) = self.table_and_pointer(&scope, &field.pointer);

            // Only the scope and the root table are in the FROM clause; any
            // other table's fields are looked up in the root table's index.
            if table != scope && table != self.root_table {
                table = self.root_table.clone();
                pointer = field.pointer.path().to_string();
            }
            if table != scope {
                join = true;
            }

            let condition = get_condition(
                &table,
                &pointer,
                field.mode,
                field.pointer.is_relative(),
                &self.predicate,
            );
            if let Some(warning) = condition.warning {
                tracing::warn!(field = %field.pointer, "{}", warning);
                warnings.push(warning);
            }

            let column = CoverageColumn {
                alias: field.alias(),
                table,
                pointer,
                mode: field.mode,
                condition: condition.sql,
            };
            match columns.iter_mut().find(|c| c.alias == column.alias) {
                Some(existing) => *existing = column,
                None => columns.push(column),
            }
        }

        let total_column = format!("total_{}", scope);
        for column in &columns {
            let name = format!("{}_percentage", column.alias);
            if name == "total_percentage" || name == total_column {
                return Err(CoreError::ReservedAlias {
                    field: column.pointer.clone(),
                    column: name,
                });
            }
        }

        let mut select = vec![format!("count(*) AS {}", total_column)];
        for column in &columns {
            select.push(percentage(&column.condition, &format!("{}_percentage", column.alias)));
        }
        let all_conditions = columns
            .iter()
            .map(|c| c.condition.as_str())
            .collect::<Vec<_>>()
            .join("\n    AND ");
        select.push(percentage(&all_conditions, "total_percentage"));

        let mut sql = format!("SELECT\n    {}\nFROM {}\n", select.join(",\n    "), scope);
        if join {
            sql.push_str(&format!(
                "JOIN {root} ON {root}.id = {scope}.id\n",
                root = self.root_table,
                scope = scope
            ));
        }

        tracing::debug!(scope = %scope, fields = columns.len(), "generated coverage SQL");

        Ok(CoverageQuery {
            sql,
            scope,
            columns,
            warnings,
        })
    }
}

fn percentage(condition: &str, alias: &str) -> String {
    format!(
        "ROUND(SUM(CASE WHEN {} THEN 1 ELSE 0 END) * 100.0 / NULLIF(count(*), 0), 2) AS {}",
        condition, alias
    )
}
