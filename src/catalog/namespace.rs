/*!
[Namespace]: a sequence of levels identifying a group of tables in a
[crate::catalog::Catalog] (spec §4.9, §6.4).
*/

use core::fmt::{self, Display};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{IcebergError, Result};

/// Joins namespace levels when a path needs to appear in a URL (spec §6.4:
/// REST paths join levels with the unit separator).
pub const REST_SEPARATOR: char = '\u{1f}';

/// A dotted sequence of levels identifying a namespace, e.g. `db.sales`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace {
    levels: Vec<String>,
}

impl Namespace {
    /// Builds a namespace from its levels. Fails if any level is empty.
    pub fn try_new(levels: &[String]) -> Result<Self> {
        if levels.iter().any(|level| level.is_empty()) {
            Err(IcebergError::InvalidInput(
                "namespace levels cannot be empty".to_string(),
            ))
        } else {
            Ok(Namespace { levels: levels.to_vec() })
        }
    }

    /// The root namespace, with no levels.
    pub fn root() -> Self {
        Namespace { levels: Vec::new() }
    }

    /// This namespace's levels.
    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    /// Number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// True for the root namespace.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// True if `self` is `other` or a descendant of it, e.g. `db.sales` is
    /// a child of `db` and of the root.
    pub fn is_child_of(&self, other: &Namespace) -> bool {
        self.levels.len() == other.levels.len() + 1 && self.levels.starts_with(&other.levels)
    }

    /// Parses the dot-separated form (`db.sales`), rejecting empty levels.
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Ok(Namespace::root());
        }
        let levels: Vec<String> = text.split('.').map(|s| s.to_string()).collect();
        Namespace::try_new(&levels)
    }

    /// Renders the REST path form: levels joined with [REST_SEPARATOR].
    pub fn to_rest_path(&self) -> String {
        Itertools::intersperse(self.levels.iter().map(|s| s.as_str()), "\u{1f}").collect()
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Itertools::intersperse(self.levels.iter().map(|s| s.as_str()), ".").collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let ns = Namespace::parse("db.sales").unwrap();
        assert_eq!(ns.levels(), &["db".to_string(), "sales".to_string()]);
        assert_eq!(format!("{ns}"), "db.sales");
    }

    #[test]
    fn test_root_is_empty() {
        let ns = Namespace::root();
        assert!(ns.is_empty());
        assert_eq!(format!("{ns}"), "");
    }

    #[test]
    fn test_rejects_empty_level() {
        assert!(Namespace::try_new(&["db".to_string(), "".to_string()]).is_err());
    }

    #[test]
    fn test_is_child_of() {
        let db = Namespace::parse("db").unwrap();
        let sales = Namespace::parse("db.sales").unwrap();
        assert!(sales.is_child_of(&db));
        assert!(db.is_child_of(&Namespace::root()));
        assert!(!db.is_child_of(&sales));
    }

    #[test]
    fn test_rest_path_uses_unit_separator() {
        let ns = Namespace::parse("db.sales").unwrap();
        assert_eq!(ns.to_rest_path(), "db\u{1f}sales");
    }
}
