//! OCDS release and record packages.
//!
//! Packages written by this crate are for offline inspection, not
//! publication, so the package metadata is filled with fixed placeholders.

use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

pub const PLACEHOLDER_URI: &str = "placeholder:";
pub const PLACEHOLDER_PUBLISHED_DATE: &str = "9999-01-01T00:00:00Z";
pub const OCDS_VERSION: &str = "1.1";

/// The two OCDS packaging shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageType {
    Release,
    Record,
}

impl PackageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageType::Release => "release",
            PackageType::Record => "record",
        }
    }

    /// File name for a package built from a query.
    pub fn file_name(&self) -> String {
        format!("{}_package.json", self.as_str())
    }

    /// File name for a package built for one OCID.
    pub fn file_name_for_ocid(&self, ocid: &str) -> String {
        format!("{}_{}_package.json", ocid, self.as_str())
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "release" => Ok(PackageType::Release),
            "record" => Ok(PackageType::Record),
            other => Err(CoreError::UnknownPackageType {
                given: other.to_string(),
            }),
        }
    }
}

fn metadata() -> Map<String, Value> {
    let mut package = Map::new();
    package.insert("uri".to_string(), json!(PLACEHOLDER_URI));
    package.insert("publisher".to_string(), json!({ "name": "" }));
    package.insert("publishedDate".to_string(), json!(PLACEHOLDER_PUBLISHED_DATE));
    package.insert("version".to_string(), json!(OCDS_VERSION));
    package
}

/// Wrap releases in a release package.
pub fn release_package(releases: Vec<Value>) -> Value {
    let mut package = metadata();
    package.insert("releases".to_string(), Value::Array(releases));
    Value::Object(package)
}

/// Wrap records in a record package.
pub fn record_package(records: Vec<Value>) -> Value {
    let mut package = metadata();
    package.insert("records".to_string(), Value::Array(records));
    Value::Object(package)
}

/// Package the releases of one contracting process.
///
/// A record package holds a single record for `ocid` whose `releases` are
/// the given releases. An OCID without releases is an error rather than an
/// empty package.
pub fn package_for_ocid(package_type: PackageType, ocid: &str, releases: Vec<Value>) -> Result<Value, CoreError> {
    if releases.is_empty() {
        return Err(CoreError::NoReleases {
            ocid: ocid.to_string(),
        });
    }
    Ok(match package_type {
        PackageType::Release => release_package(releases),
        PackageType::Record => record_package(vec![json!({
            "ocid": ocid,
            "releases": releases,
        })]),
    })
}

/// Package `data` rows returned by a query: releases for a release package,
/// whole records for a record package.
pub fn package_from_rows(package_type: PackageType, rows: Vec<Value>) -> Value {
    match package_type {
        PackageType::Release => release_package(rows),
        PackageType::Record => record_package(rows),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UNKNOWN_PACKAGE_TYPE_MESSAGE;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_package_type() {
        assert_eq!("release".parse::<PackageType>().unwrap(), PackageType::Release);
        assert_eq!("record".parse::<PackageType>().unwrap(), PackageType::Record);
    }

    #[test]
    fn test_unknown_package_type() {
        let err = "other".parse::<PackageType>().unwrap_err();
        assert!(matches!(err, CoreError::UnknownPackageType { ref given } if given == "other"));
        assert_eq!(err.to_string(), UNKNOWN_PACKAGE_TYPE_MESSAGE);
        assert_eq!(
            err.to_string(),
            "package_type argument must be either 'release' or 'record'"
        );
    }

    #[test]
    fn test_file_names() {
        assert_eq!(PackageType::Release.file_name(), "release_package.json");
        assert_eq!(
            PackageType::Record.file_name_for_ocid("ocds-213czf-1"),
            "ocds-213czf-1_record_package.json"
        );
    }

    #[test]
    fn test_release_package_for_ocid() {
        let package = package_for_ocid(
            PackageType::Release,
            "ocds-213czf-1",
            vec![json!({"ocid": "ocds-213czf-1"})],
        )
        .unwrap();
        assert_eq!(
            package,
            json!({
                "uri": "placeholder:",
                "publisher": {"name": ""},
                "publishedDate": "9999-01-01T00:00:00Z",
                "version": "1.1",
                "releases": [{"ocid": "ocds-213czf-1"}],
            })
        );
    }

    #[test]
    fn test_record_package_for_ocid() {
        let package = package_for_ocid(
            PackageType::Record,
            "ocds-213czf-1",
            vec![json!({"ocid": "ocds-213czf-1"})],
        )
        .unwrap();
        assert_eq!(
            package["records"],
            json!([{
                "ocid": "ocds-213czf-1",
                "releases": [{"ocid": "ocds-213czf-1"}],
            }])
        );
        assert_eq!(package["version"], "1.1");
    }

    #[test]
    fn test_package_for_ocid_without_releases() {
        for package_type in [PackageType::Release, PackageType::Record] {
            let err = package_for_ocid(package_type, "ocds-213czf-9", Vec::new()).unwrap_err();
            assert!(matches!(err, CoreError::NoReleases { ref ocid } if ocid == "ocds-213czf-9"));
            assert_eq!(err.to_string(), "no releases found for OCID 'ocds-213czf-9'");
        }
    }

    #[test]
    fn test_record_package_from_rows_keeps_records() {
        let record = json!({"ocid": "ocds-213czf-2", "releases": [{"ocid": "ocds-213czf-2"}]});
        let package = package_from_rows(PackageType::Record, vec![record.clone()]);
        assert_eq!(package["records"], json!([record]));
        assert!(package.get("releases").is_none());
    }
}
