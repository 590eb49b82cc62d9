//! Subcommand implementations for the `kingfisher` CLI.

pub mod coverage;
pub mod flatten;
pub mod package;
pub mod query;

use serde_json::Value;

/// Parse a `--param` value as JSON, falling back to a plain string, so that
/// `--param 1` binds an integer and `--param ocds-213czf-1` a string.
pub fn parse_param(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub fn parse_params(raw: &[String]) -> Vec<Value> {
    raw.iter().map(|p| parse_param(p)).collect()
}
