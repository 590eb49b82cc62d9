//! Helpers for browsing the Kingfisher collection registry.

use serde_json::{json, Value};

use kingfisher_core::pointer::validate_identifier;
use kingfisher_core::Table;

use crate::error::PgError;
use crate::{search_path_statement, Session};

impl Session {
    /// Put `schema` in front of `public` on the search path, so that the
    /// summary tables of one collection can be queried unqualified.
    pub async fn set_search_path(&self, schema: &str) -> Result<(), PgError> {
        validate_identifier(schema)?;
        self.execute_statement(&search_path_statement(schema), &[]).await?;
        self.remember_search_path(schema);
        tracing::info!(schema, "search path set");
        Ok(())
    }

    /// Source IDs containing `pattern` (case-insensitive), alphabetically.
    /// An empty pattern lists every source.
    pub async fn list_source_ids(&self, pattern: &str) -> Result<Table, PgError> {
        let sql = "SELECT source_id FROM collection WHERE source_id ILIKE $1 \
                   GROUP BY source_id ORDER BY source_id";
        self.get_dataframe_from_query(sql, &[like_pattern(pattern)]).await
    }

    /// Collections, newest first, optionally only those of one source.
    pub async fn list_collections(&self, source_id: Option<&str>) -> Result<Table, PgError> {
        match source_id {
            Some(source_id) => {
                self.get_dataframe_from_query(
                    "SELECT * FROM collection WHERE source_id = $1 ORDER BY id DESC",
                    &[json!(source_id)],
                )
                .await
            }
            None => {
                self.get_dataframe_from_query("SELECT * FROM collection ORDER BY id DESC", &[])
                    .await
            }
        }
    }
}

/// `%pattern%` with LIKE wildcards in the pattern escaped.
fn like_pattern(pattern: &str) -> Value {
    let escaped = pattern
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    json!(format!("%{}%", escaped))
}
