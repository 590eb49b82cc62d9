//! # kingfisher-core
//!
//! Database-independent pieces of Kingfisher Colab:
//!
//! - [`coverage`]: SQL that measures how often OCDS fields are populated,
//!   computed over Kingfisher Summarize's summary tables
//! - [`package`]: release and record packages for downloading
//! - [`frame`]: the [`Table`] type query results are returned in
//! - [`notebook`]: statement tagging with the calling notebook's URL
//! - [`config`]: YAML configuration shared by every crate

pub mod config;
pub mod coverage;
pub mod error;
pub mod frame;
pub mod notebook;
pub mod package;
pub mod pointer;

pub use config::{ConfigError, KingfisherConfig, UpstreamConfig};
pub use coverage::{ArraySegmentPredicate, CoverageGenerator, CoverageQuery, PluralSegment};
pub use error::CoreError;
pub use frame::Table;
pub use notebook::StatementTagger;
pub use package::PackageType;
pub use pointer::{FieldSpec, Mode, Pointer};
