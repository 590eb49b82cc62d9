//! Configuration for Kingfisher Colab.
//!
//! Everything a notebook used to keep in module-level globals (the current
//! connection, the target spreadsheet name) lives here instead and is passed
//! explicitly. Configuration is read from a single YAML file:
//!
//! ```yaml
//! upstream:
//!   database_url_env: KINGFISHER_DATABASE_URL
//! session:
//!   notebook_id: 1lpWoGnOb6KcjHDEhSBjWZgA8aBLCfDp0
//!   search_path: view_data_collection_1
//! export:
//!   output_dir: downloads
//!   spreadsheet_name: coverage-results
//! ```

pub mod upstream;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use upstream::{SslMode, UpstreamConfig};

/// OCDS 1.1 release schema, used when flattening packages.
pub const DEFAULT_SCHEMA_URL: &str =
    "https://standard.open-contracting.org/1.1/en/release-schema.json";

/// Complete configuration loaded from `kingfisher.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KingfisherConfig {
    /// Database connection.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub coverage: CoverageConfig,
}

/// Per-session database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Identifier of the calling notebook. When set, every statement is
    /// prefixed with a comment naming it, so the statement can be traced
    /// back from `pg_stat_activity`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notebook_id: Option<String>,

    /// Schema to put in front of `public` on the search path after connecting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_path: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            notebook_id: None,
            search_path: None,
            max_connections: default_max_connections(),
        }
    }
}

/// Where exported files go.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory that receives "downloaded" files.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Spreadsheet that worksheets are added to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet_name: Option<String>,

    /// Release schema recorded in flattened workbooks.
    #[serde(default = "default_schema_url")]
    pub schema_url: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            spreadsheet_name: None,
            schema_url: default_schema_url(),
        }
    }
}

/// Coverage generator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageConfig {
    /// Summary table with one row per release, used when no other table matches.
    #[serde(default = "default_root_table")]
    pub root_table: String,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            root_table: default_root_table(),
        }
    }
}

fn default_max_connections() -> u32 {
    1
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_schema_url() -> String {
    DEFAULT_SCHEMA_URL.to_string()
}

fn default_root_table() -> String {
    crate::coverage::ROOT_TABLE.to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl KingfisherConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }
}
