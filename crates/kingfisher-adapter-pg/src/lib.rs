//! # kingfisher-adapter-pg
//!
//! Postgres access for Kingfisher Colab.
//!
//! A [`Session`] replaces the module-level connection a notebook keeps: it
//! is created from an [`UpstreamConfig`], can be reset and reopened, and is
//! passed to every helper that needs the database. Statements run inside a
//! transaction that is rolled back when they fail; the database error is
//! returned unchanged.

use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Executor;
use std::sync::{Arc, Mutex};

use kingfisher_core::config::SessionConfig;
use kingfisher_core::pointer::validate_identifier;
use kingfisher_core::{StatementTagger, Table, UpstreamConfig};

pub mod catalog;
pub mod coverage;
pub mod error;
pub mod introspect;
pub mod packages;
pub mod params;
pub mod rows;

pub use coverage::{CoverageOptions, CoverageOutcome, CoverageReport};
pub use error::PgError;

/// Options that apply to every connection of a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub max_connections: u32,
    pub notebook_id: Option<String>,
    pub search_path: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_connections: 1,
            notebook_id: None,
            search_path: None,
        }
    }
}

impl From<&SessionConfig> for SessionOptions {
    fn from(config: &SessionConfig) -> Self {
        Self {
            max_connections: config.max_connections.max(1),
            notebook_id: config.notebook_id.clone(),
            search_path: config.search_path.clone(),
        }
    }
}

/// An open (or resettable) connection to a Kingfisher database.
pub struct Session {
    upstream: UpstreamConfig,
    max_connections: u32,
    tagger: StatementTagger,
    /// Shared with the pool's connect hook so that connections opened after
    /// `set_search_path` get the same path.
    search_path: Arc<Mutex<Option<String>>>,
    pool: Option<PgPool>,
}

impl Session {
    /// Connect to the database.
    pub async fn connect(upstream: &UpstreamConfig, options: SessionOptions) -> Result<Self, PgError> {
        if let Some(schema) = &options.search_path {
            validate_identifier(schema)?;
        }
        let mut session = Self {
            upstream: upstream.clone(),
            max_connections: options.max_connections.max(1),
            tagger: StatementTagger::new(options.notebook_id),
            search_path: Arc::new(Mutex::new(options.search_path)),
            pool: None,
        };
        session.ensure_connected().await?;
        Ok(session)
    }

    /// Wrap an existing pool, e.g. one shared with other code.
    pub fn from_pool(pool: PgPool, tagger: StatementTagger) -> Self {
        Self {
            upstream: UpstreamConfig::default(),
            max_connections: 1,
            tagger,
            search_path: Arc::new(Mutex::new(None)),
            pool: Some(pool),
        }
    }

    /// Open the pool if it was never opened, was reset, or was closed.
    pub async fn ensure_connected(&mut self) -> Result<(), PgError> {
        if let Some(pool) = &self.pool
            && !pool.is_closed()
        {
            return Ok(());
        }
        self.reset().await;

        let search_path = Arc::clone(&self.search_path);
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .after_connect(move |conn, _meta| {
                let schema = search_path.lock().ok().and_then(|s| s.clone());
                Box::pin(async move {
                    if let Some(schema) = schema {
                        conn.execute(search_path_statement(&schema).as_str()).await?;
                    }
                    Ok(())
                })
            })
            .connect(&self.upstream.connection_string())
            .await?;

        tracing::info!(target = %self.upstream.redacted(), "connected to database");
        self.pool = Some(pool);
        Ok(())
    }

    /// Close the pool. The session stays closed until
    /// [`ensure_connected`](Self::ensure_connected) is called.
    pub async fn reset(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
            tracing::info!("database session reset");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.pool.as_ref().is_some_and(|pool| !pool.is_closed())
    }

    pub fn pool(&self) -> Result<&PgPool, PgError> {
        match &self.pool {
            Some(pool) if !pool.is_closed() => Ok(pool),
            _ => Err(PgError::Closed),
        }
    }

    pub fn tagger(&self) -> &StatementTagger {
        &self.tagger
    }

    /// The schema currently in front of `public`, if one was set.
    pub fn search_path(&self) -> Option<String> {
        self.search_path.lock().ok().and_then(|s| s.clone())
    }

    pub(crate) fn remember_search_path(&self, schema: &str) {
        if let Ok(mut current) = self.search_path.lock() {
            *current = Some(schema.to_string());
        }
    }

    /// Run one statement and return its rows.
    ///
    /// The statement is tagged with the notebook comment and run in its own
    /// transaction. On failure the transaction is rolled back and the
    /// database error is returned unchanged.
    pub async fn execute_statement(&self, sql: &str, params: &[Value]) -> Result<Vec<PgRow>, PgError> {
        let pool = self.pool()?;
        let sql = self.tagger.tag(sql);
        let args = params::bind_params(params)?;

        tracing::debug!(sql = %sql, params = params.len(), "executing statement");

        let mut tx = pool.begin().await?;
        match sqlx::query_with(&sql, args).fetch_all(&mut *tx).await {
            Ok(rows) => {
                tx.commit().await?;
                Ok(rows)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                tracing::info!(error = %e, "statement failed, transaction rolled back");
                Err(PgError::Database(e))
            }
        }
    }

    /// Run a query and return its rows as lists of values.
    pub async fn get_list_from_query(&self, sql: &str, params: &[Value]) -> Result<Vec<Vec<Value>>, PgError> {
        let rows = self.execute_statement(sql, params).await?;
        Ok(rows.iter().map(rows::row_to_values).collect())
    }

    /// Run a query and return its rows as a [`Table`].
    pub async fn get_dataframe_from_query(&self, sql: &str, params: &[Value]) -> Result<Table, PgError> {
        let rows = self.execute_statement(sql, params).await?;
        Ok(rows::rows_to_table(&rows))
    }
}

pub(crate) fn search_path_statement(schema: &str) -> String {
    format!("SET search_path = {}, public", schema)
}
