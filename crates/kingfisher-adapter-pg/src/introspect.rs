//! Discovering the summary tables on the search path.

use sqlx::Row;
use std::collections::BTreeSet;

use crate::error::PgError;
use crate::Session;

impl Session {
    /// Names of the `*_summary` tables and views visible on the search path.
    ///
    /// These are produced by Kingfisher Summarize, one schema per summarized
    /// collection, so the result depends on [`Session::set_search_path`].
    pub async fn summary_tables(&self) -> Result<BTreeSet<String>, PgError> {
        let rows = self
            .execute_statement(
                r#"
                select table_name::text as table_name
                from information_schema.tables
                where table_schema = any(current_schemas(false))
                  and table_name like '%\_summary'
                order by table_name
                "#,
                &[],
            )
            .await?;

        let tables: BTreeSet<String> = rows
            .into_iter()
            .map(|r| r.try_get::<String, _>("table_name"))
            .collect::<Result<_, _>>()?;

        tracing::debug!(count = tables.len(), "found summary tables");
        Ok(tables)
    }
}
