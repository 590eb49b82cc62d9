//! Reading release and record data for packaging.

use serde_json::{json, Value};

use kingfisher_core::package::{package_for_ocid, package_from_rows};
use kingfisher_core::{PackageType, Table};

use crate::error::PgError;
use crate::Session;

const RELEASES_FOR_OCID: &str = "SELECT data FROM data \
    JOIN release ON data.id = release.data_id \
    WHERE collection_id = $1 AND ocid = $2 \
    ORDER BY release.id";

impl Session {
    /// The release data of one contracting process in one collection.
    pub async fn releases_for_ocid(&self, collection_id: i64, ocid: &str) -> Result<Vec<Value>, PgError> {
        let table = self
            .get_dataframe_from_query(RELEASES_FOR_OCID, &[json!(collection_id), json!(ocid)])
            .await?;
        data_column(&table)
    }

    /// The `data` column of a query's rows, or the first column when there
    /// is no column named `data`.
    pub async fn data_from_query(&self, sql: &str, params: &[Value]) -> Result<Vec<Value>, PgError> {
        let table = self.get_dataframe_from_query(sql, params).await?;
        data_column(&table)
    }

    /// Build a package for one OCID. `package_type` is checked before the
    /// database is queried.
    pub async fn package_for_ocid(
        &self,
        collection_id: i64,
        ocid: &str,
        package_type: &str,
    ) -> Result<(PackageType, Value), PgError> {
        let package_type: PackageType = package_type.parse()?;
        let releases = self.releases_for_ocid(collection_id, ocid).await?;
        Ok((package_type, package_for_ocid(package_type, ocid, releases)?))
    }

    /// Build a package from the data returned by `sql`.
    pub async fn package_from_query(
        &self,
        sql: &str,
        params: &[Value],
        package_type: &str,
    ) -> Result<(PackageType, Value), PgError> {
        let package_type: PackageType = package_type.parse()?;
        let rows = self.data_from_query(sql, params).await?;
        Ok((package_type, package_from_rows(package_type, rows)))
    }
}

fn data_column(table: &Table) -> Result<Vec<Value>, PgError> {
    if table.is_empty() {
        return Ok(Vec::new());
    }
    let index = table.column_index("data").unwrap_or(0);
    table
        .rows
        .iter()
        .map(|row| {
            row.get(index).cloned().ok_or_else(|| PgError::Decode {
                column: "data".to_string(),
                reason: "query returned no columns".to_string(),
            })
        })
        .collect()
}
