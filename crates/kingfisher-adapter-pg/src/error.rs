//! Error types for the Postgres adapter.

use kingfisher_core::CoreError;
use thiserror::Error;

/// Errors that can occur while talking to the database.
#[derive(Debug, Error)]
pub enum PgError {
    /// The statement failed. The transaction has been rolled back and the
    /// database's own message is kept as-is.
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// SQL or package construction failed before anything was sent.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The session was reset and not reconnected.
    #[error("the database session is closed")]
    Closed,

    /// A parameter could not be bound.
    #[error("cannot bind parameter ${index}: {reason}")]
    Parameter { index: usize, reason: String },

    /// Generated SQL could not be written to its output.
    #[error("cannot write SQL: {0}")]
    Output(#[from] std::io::Error),

    /// A result column has an unexpected shape.
    #[error("unexpected value in column '{column}': {reason}")]
    Decode { column: String, reason: String },
}

impl PgError {
    /// The SQLSTATE code, when the database reported one.
    pub fn sqlstate(&self) -> Option<String> {
        match self {
            PgError::Database(sqlx::Error::Database(db)) => db.code().map(|c| c.into_owned()),
            _ => None,
        }
    }
}
