//! Integration tests for the Kingfisher Postgres session.
//!
//! These tests require a running Postgres instance.
//! Set DATABASE_URL to connect; without it every test returns early.
//!
//! Run with: cargo test --package kingfisher-adapter-pg --test session_tests

use kingfisher_adapter_pg::{CoverageOptions, CoverageOutcome, PgError, Session, SessionOptions};
use kingfisher_core::{CoreError, UpstreamConfig};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use std::sync::atomic::{AtomicUsize, Ordering};

const NOTEBOOK_ID: &str = "1lpWoGnOb6KcjHDEhSBjWZgA8aBLCfDp0";

static SCHEMA_COUNTER: AtomicUsize = AtomicUsize::new(0);

struct Fixture {
    admin: PgPool,
    schema: String,
    session: Session,
}

impl Fixture {
    async fn teardown(self) {
        let mut session = self.session;
        session.reset().await;
        let _ = self
            .admin
            .execute(format!("DROP SCHEMA {} CASCADE", self.schema).as_str())
            .await;
        self.admin.close().await;
    }
}

async fn setup() -> Option<Fixture> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let schema = format!(
        "kingfisher_test_{}_{}",
        std::process::id(),
        SCHEMA_COUNTER.fetch_add(1, Ordering::SeqCst)
    );

    let admin = PgPoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .expect("connect to DATABASE_URL");

    let statements = [
        format!("CREATE SCHEMA {schema}"),
        format!("CREATE TABLE {schema}.collection (id int, source_id text, transform_from_collection_id int)"),
        format!("CREATE TABLE {schema}.release (id int, collection_id int, ocid text, data_id int)"),
        format!("CREATE TABLE {schema}.record (id int, collection_id int, ocid text, data_id int)"),
        format!("CREATE TABLE {schema}.data (id int, data jsonb)"),
        format!("CREATE TABLE {schema}.release_summary (id int, field_list jsonb)"),
        format!("CREATE TABLE {schema}.awards_summary (id int, award_index int, field_list jsonb)"),
        format!("CREATE TABLE {schema}.parties_summary (id int, party_index int, field_list jsonb)"),
        format!(
            "INSERT INTO {schema}.collection VALUES \
             (1, 'scotland', NULL), (2, 'paraguay_dncp_records', NULL), \
             (3, 'paraguay_dncp_releases', NULL), (4, 'paraguay_dncp_releases', 3), \
             (5, 'paraguay_dncp_releases', 4)"
        ),
        format!("INSERT INTO {schema}.release VALUES (1, 1, 'ocds-213czf-1', 1)"),
        format!("INSERT INTO {schema}.record VALUES (1, 1, 'ocds-213czf-2', 2)"),
        format!(
            r#"INSERT INTO {schema}.data VALUES
               (1, '{{"ocid":"ocds-213czf-1"}}'::jsonb),
               (2, '{{"ocid":"ocds-213czf-2","releases":[{{"ocid":"ocds-213czf-2"}}]}}'::jsonb)"#
        ),
        format!(
            r#"INSERT INTO {schema}.release_summary VALUES
               (1, '{{"ocid": 1, "tender": 1, "tender/title": 1}}'::jsonb),
               (2, '{{"ocid": 1}}'::jsonb)"#
        ),
        format!(
            r#"INSERT INTO {schema}.awards_summary VALUES
               (1, 0, '{{"date": 1, "items": 2, "items/description": 2}}'::jsonb),
               (1, 1, '{{"items": 2, "items/description": 1}}'::jsonb),
               (2, 0, '{{"date": 1}}'::jsonb)"#
        ),
    ];
    for statement in &statements {
        admin.execute(statement.as_str()).await.expect("fixture statement");
    }

    let upstream = UpstreamConfig {
        database_url: Some(url),
        ..Default::default()
    };
    let session = Session::connect(
        &upstream,
        SessionOptions {
            notebook_id: Some(NOTEBOOK_ID.to_string()),
            search_path: Some(schema.clone()),
            ..Default::default()
        },
    )
    .await
    .expect("open session");

    Some(Fixture {
        admin,
        schema,
        session,
    })
}

#[tokio::test]
async fn test_get_list_from_query() {
    let Some(fixture) = setup().await else { return };

    let rows = fixture
        .session
        .get_list_from_query("SELECT * FROM release", &[])
        .await
        .unwrap();
    assert_eq!(rows, vec![vec![json!(1), json!(1), json!("ocds-213czf-1"), json!(1)]]);

    fixture.teardown().await;
}

#[tokio::test]
async fn test_get_dataframe_from_query_with_params() {
    let Some(fixture) = setup().await else { return };

    let table = fixture
        .session
        .get_dataframe_from_query("SELECT ocid, data_id FROM release WHERE collection_id = $1", &[json!(1)])
        .await
        .unwrap();
    assert_eq!(table.columns, vec!["ocid", "data_id"]);
    assert_eq!(table.rows, vec![vec![json!("ocds-213czf-1"), json!(1)]]);

    fixture.teardown().await;
}

#[tokio::test]
async fn test_error_is_returned_unchanged_and_session_recovers() {
    let Some(fixture) = setup().await else { return };

    let err = fixture
        .session
        .get_dataframe_from_query("invalid", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, PgError::Database(_)));
    assert_eq!(err.sqlstate().as_deref(), Some("42601"));
    assert!(err.to_string().contains("syntax error at or near \"invalid\""));

    // The failed transaction was rolled back, so the next statement works.
    let rows = fixture.session.get_list_from_query("SELECT 1", &[]).await.unwrap();
    assert_eq!(rows, vec![vec![json!(1)]]);

    fixture.teardown().await;
}

#[tokio::test]
async fn test_statements_are_tagged() {
    let Some(fixture) = setup().await else { return };

    let rows = fixture
        .session
        .get_list_from_query("SELECT query FROM pg_stat_activity WHERE pid = pg_backend_pid()", &[])
        .await
        .unwrap();
    let query = rows[0][0].as_str().unwrap();
    assert!(query.starts_with(&format!(
        "/* https://colab.research.google.com/drive/{} */",
        NOTEBOOK_ID
    )));

    fixture.teardown().await;
}

#[tokio::test]
async fn test_set_search_path() {
    let Some(fixture) = setup().await else { return };

    fixture.session.set_search_path(&fixture.schema).await.unwrap();
    let rows = fixture.session.get_list_from_query("SHOW search_path", &[]).await.unwrap();
    assert_eq!(rows[0][0], json!(format!("{}, public", fixture.schema)));
    assert_eq!(fixture.session.search_path().as_deref(), Some(fixture.schema.as_str()));

    fixture.teardown().await;
}

#[tokio::test]
async fn test_list_source_ids() {
    let Some(fixture) = setup().await else { return };

    let table = fixture.session.list_source_ids("paraguay").await.unwrap();
    assert_eq!(
        table.column("source_id").unwrap(),
        vec![&json!("paraguay_dncp_records"), &json!("paraguay_dncp_releases")]
    );

    let table = fixture.session.list_source_ids("").await.unwrap();
    assert_eq!(table.rows.len(), 3);

    fixture.teardown().await;
}

#[tokio::test]
async fn test_list_collections() {
    let Some(fixture) = setup().await else { return };

    let table = fixture
        .session
        .list_collections(Some("paraguay_dncp_releases"))
        .await
        .unwrap();
    assert_eq!(table.columns.len(), 3);
    assert_eq!(table.column("id").unwrap(), vec![&json!(5), &json!(4), &json!(3)]);
    assert_eq!(
        table.column("transform_from_collection_id").unwrap(),
        vec![&json!(4), &json!(3), &Value::Null]
    );

    fixture.teardown().await;
}

#[tokio::test]
async fn test_summary_tables() {
    let Some(fixture) = setup().await else { return };

    let tables = fixture.session.summary_tables().await.unwrap();
    for table in ["awards_summary", "parties_summary", "release_summary"] {
        assert!(tables.contains(table), "{} not found", table);
    }
    assert!(!tables.contains("collection"));

    fixture.teardown().await;
}

#[tokio::test]
async fn test_calculate_coverage() {
    let Some(fixture) = setup().await else { return };

    let outcome = fixture
        .session
        .calculate_coverage(&[":date", "ALL :items/description"], Some("awards_summary"), CoverageOptions::default())
        .await
        .unwrap();
    let CoverageOutcome::Report(report) = outcome else {
        panic!("expected a report");
    };
    assert_eq!(report.total, 3);
    assert_eq!(report.percentage("date"), Some(66.67));
    assert_eq!(report.percentage("all_items_description"), Some(33.33));
    assert_eq!(report.total_percentage, Some(33.33));

    fixture.teardown().await;
}

#[tokio::test]
async fn test_calculate_coverage_long_field() {
    let Some(fixture) = setup().await else { return };

    let alias = "all_contracts_implementation_transactions_value_currency";
    let outcome = fixture
        .session
        .calculate_coverage(
            &[":date", "ALL :contracts/implementation/transactions/value/currency"],
            Some("awards_summary"),
            CoverageOptions::default(),
        )
        .await
        .unwrap();
    let CoverageOutcome::Report(report) = outcome else {
        panic!("expected a report");
    };
    assert_eq!(report.total, 3);
    assert_eq!(report.percentage("date"), Some(66.67));
    assert_eq!(report.percentage(alias), Some(0.0));
    assert_eq!(report.total_percentage, Some(0.0));

    fixture.teardown().await;
}

#[tokio::test]
async fn test_calculate_coverage_with_join() {
    let Some(fixture) = setup().await else { return };

    let outcome = fixture
        .session
        .calculate_coverage(&[":date", "tender/title"], Some("awards_summary"), CoverageOptions::default())
        .await
        .unwrap();
    let CoverageOutcome::Report(report) = outcome else {
        panic!("expected a report");
    };
    // Awards 1/0 and 1/1 belong to release 1, which has a tender title.
    assert_eq!(report.percentage("tender_title"), Some(66.67));
    assert_eq!(report.total_percentage, Some(33.33));

    fixture.teardown().await;
}

#[tokio::test]
async fn test_calculate_coverage_empty_scope() {
    let Some(fixture) = setup().await else { return };

    let outcome = fixture
        .session
        .calculate_coverage(&[":roles"], Some("parties_summary"), CoverageOptions::default())
        .await
        .unwrap();
    let CoverageOutcome::Report(report) = outcome else {
        panic!("expected a report");
    };
    assert_eq!(report.total, 0);
    assert_eq!(report.percentage("roles"), None);

    fixture.teardown().await;
}

#[tokio::test]
async fn test_calculate_coverage_return_sql() {
    let Some(fixture) = setup().await else { return };

    let outcome = fixture
        .session
        .calculate_coverage(
            &["ocid"],
            Some("release_summary"),
            CoverageOptions {
                print_sql: false,
                return_sql: true,
            },
        )
        .await
        .unwrap();
    let CoverageOutcome::Sql(query) = outcome else {
        panic!("expected SQL");
    };
    assert!(query.sql.contains("FROM release_summary"));

    fixture.teardown().await;
}

#[tokio::test]
async fn test_calculate_coverage_missing_fields() {
    let Some(fixture) = setup().await else { return };

    let fields: [&str; 0] = [];
    let err = fixture
        .session
        .calculate_coverage(&fields, Some("release_summary"), CoverageOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PgError::Core(CoreError::MissingFields)));

    fixture.teardown().await;
}

#[tokio::test]
async fn test_package_for_ocid() {
    let Some(fixture) = setup().await else { return };

    let (_, package) = fixture
        .session
        .package_for_ocid(1, "ocds-213czf-1", "record")
        .await
        .unwrap();
    assert_eq!(
        package["records"],
        json!([{"ocid": "ocds-213czf-1", "releases": [{"ocid": "ocds-213czf-1"}]}])
    );

    fixture.teardown().await;
}

#[tokio::test]
async fn test_package_for_unknown_ocid() {
    let Some(fixture) = setup().await else { return };

    let err = fixture
        .session
        .package_for_ocid(1, "ocds-213czf-404", "release")
        .await
        .unwrap_err();
    assert!(matches!(err, PgError::Core(CoreError::NoReleases { ref ocid }) if ocid == "ocds-213czf-404"));

    fixture.teardown().await;
}

#[tokio::test]
async fn test_package_from_query() {
    let Some(fixture) = setup().await else { return };

    let sql = "SELECT data FROM data JOIN record ON data.id = record.data_id \
               WHERE collection_id = $1 AND ocid = $2";
    let (_, package) = fixture
        .session
        .package_from_query(sql, &[json!(1), json!("ocds-213czf-2")], "record")
        .await
        .unwrap();
    assert_eq!(
        package["records"],
        json!([{"ocid": "ocds-213czf-2", "releases": [{"ocid": "ocds-213czf-2"}]}])
    );

    fixture.teardown().await;
}

#[tokio::test]
async fn test_reset_and_reconnect() {
    let Some(mut fixture) = setup().await else { return };

    fixture.session.reset().await;
    assert!(matches!(
        fixture.session.get_list_from_query("SELECT 1", &[]).await,
        Err(PgError::Closed)
    ));

    fixture.session.ensure_connected().await.unwrap();
    // The search path survives the reconnect.
    let rows = fixture.session.get_list_from_query("SELECT count(*) FROM release", &[]).await.unwrap();
    assert_eq!(rows, vec![vec![json!(1)]]);

    fixture.teardown().await;
}
