//! Error types for the core crate.

use thiserror::Error;

/// Message reported for any package type other than `release` or `record`.
pub const UNKNOWN_PACKAGE_TYPE_MESSAGE: &str =
    "package_type argument must be either 'release' or 'record'";

/// Errors raised while building SQL or packages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The coverage generator was called without any fields.
    #[error("missing fields: at least one field is required to calculate coverage")]
    MissingFields,

    /// A package type outside `release` / `record`.
    #[error("{}", UNKNOWN_PACKAGE_TYPE_MESSAGE)]
    UnknownPackageType { given: String },

    /// No release data was found for the OCID being packaged.
    #[error("no releases found for OCID '{ocid}'")]
    NoReleases { ocid: String },

    /// A field's alias would produce a column name the statement already uses.
    #[error("field '{field}' collides with the generated column '{column}'")]
    ReservedAlias { field: String, column: String },

    /// A table name or pointer segment that cannot be interpolated into SQL.
    #[error("invalid identifier '{identifier}'")]
    InvalidIdentifier { identifier: String },

    /// A frame with no rows was passed where data is required.
    #[error("data frame is empty")]
    EmptyFrame,

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
