//! Field specifications for coverage: `[ALL ]<pointer>`.

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// How presence is measured for a field nested in arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Present in at least one element.
    #[default]
    Any,
    /// Present in every element of the nearest enclosing array.
    All,
}

/// A slash-delimited path into an OCDS document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pointer {
    /// From the document root, e.g. `awards/items/description`.
    Absolute(String),
    /// From the scope table's object, written `:items/description`.
    Relative(String),
}

impl Pointer {
    /// The path without the relative marker.
    pub fn path(&self) -> &str {
        match self {
            Pointer::Absolute(path) | Pointer::Relative(path) => path,
        }
    }

    pub fn is_relative(&self) -> bool {
        matches!(self, Pointer::Relative(_))
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path().split('/')
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pointer::Absolute(path) => write!(f, "{}", path),
            Pointer::Relative(path) => write!(f, ":{}", path),
        }
    }
}

impl FromStr for Pointer {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (relative, path) = match s.strip_prefix(':') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let path = path.trim_matches('/');
        for segment in path.split('/') {
            validate_identifier(segment)?;
        }
        Ok(if relative {
            Pointer::Relative(path.to_string())
        } else {
            Pointer::Absolute(path.to_string())
        })
    }
}

/// One entry of the `fields` argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldSpec {
    pub mode: Mode,
    pub pointer: Pointer,
}

impl FieldSpec {
    /// Column alias: the path with `/` replaced by `_`, lower-cased, and
    /// prefixed with `all_` in [`Mode::All`].
    pub fn alias(&self) -> String {
        let base = self.pointer.path().replace('/', "_").to_lowercase();
        match self.mode {
            Mode::Any => base,
            Mode::All => format!("all_{}", base),
        }
    }
}

impl FromStr for FieldSpec {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (mode, rest) = match s.get(..4) {
            Some(prefix) if prefix.eq_ignore_ascii_case("all ") => (Mode::All, s[4..].trim_start()),
            _ => (Mode::Any, s),
        };
        Ok(Self {
            mode,
            pointer: rest.parse()?,
        })
    }
}

/// Check that `identifier` is safe to interpolate into SQL text.
///
/// Table names and pointer segments are written into generated SQL, so they
/// are restricted to ASCII letters, digits and underscores.
pub fn validate_identifier(identifier: &str) -> Result<(), CoreError> {
    if identifier.is_empty()
        || !identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(CoreError::InvalidIdentifier {
            identifier: identifier.to_string(),
        });
    }
    Ok(())
}
