/*!
[TableIdentifier]: a namespace plus a table name (spec §4.9).
*/

use core::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::error::{IcebergError, Result};

use super::namespace::Namespace;

/// Separator between namespace levels and the table name in the dotted form.
pub const SEPARATOR: &str = ".";

/// Identifies a table within a catalog: a namespace plus a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableIdentifier {
    namespace: Namespace,
    name: String,
}

impl TableIdentifier {
    /// Builds an identifier from an explicit namespace and name. Fails if
    /// `name` is empty.
    pub fn new(namespace: Namespace, name: &str) -> Result<Self> {
        if name.is_empty() {
            Err(IcebergError::InvalidInput("table name cannot be empty".to_string()))
        } else {
            Ok(TableIdentifier { namespace, name: name.to_string() })
        }
    }

    /// Builds an identifier from a flat sequence where the last element is
    /// the table name and the rest form its namespace.
    pub fn try_new(names: &[String]) -> Result<Self> {
        match names.split_last() {
            None => Err(IcebergError::InvalidInput(
                "cannot build a table identifier from an empty sequence".to_string(),
            )),
            Some((name, namespace_levels)) => TableIdentifier::new(Namespace::try_new(namespace_levels)?, name),
        }
    }

    /// Parses the dotted form (`db.sales.orders`).
    pub fn parse(identifier: &str) -> Result<Self> {
        let names: Vec<String> = identifier.split(SEPARATOR).map(|s| s.to_string()).collect();
        TableIdentifier::try_new(&names)
    }

    /// The table's namespace.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// The table's bare name, without its namespace.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}{}{}", self.namespace, SEPARATOR, self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_display() {
        let id = TableIdentifier::try_new(&["db".to_string(), "sales".to_string(), "orders".to_string()]).unwrap();
        assert_eq!(format!("{id}"), "db.sales.orders");
        assert_eq!(id.name(), "orders");
        assert_eq!(id.namespace().levels(), &["db".to_string(), "sales".to_string()]);
    }

    #[test]
    fn test_rejects_empty_name() {
        assert!(TableIdentifier::try_new(&["db".to_string(), "".to_string()]).is_err());
    }

    #[test]
    fn test_rejects_empty_sequence() {
        assert!(TableIdentifier::try_new(&[]).is_err());
    }

    #[test]
    fn test_parse() {
        let id = TableIdentifier::parse("orders").unwrap();
        assert!(id.namespace().is_empty());
        assert_eq!(id.name(), "orders");
    }
}
