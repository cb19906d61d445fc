//! Table and column naming.
//!
//! These names are the persisted format: two builds agree on a database only
//! if every function here produces the same bytes. Field names and root table
//! names are identifiers, so they never contain [`SEPARATOR`] and cannot
//! collide with generated names. Index names carry a doubled separator, which
//! no table path produces, since SQLite keeps tables and indexes in one
//! namespace.

use crate::error::{MarshalError, Result};
use crate::types::{validate_identifier, TypeError};

/// Separator joining table path segments and column suffixes.
pub const SEPARATOR: char = '$';

/// Value column of a table whose element type is a scalar.
pub const VALUE_COLUMN: &str = "value";

/// Name of the child table holding field `field` of `parent`.
pub fn child_table(parent: &str, field: &str) -> String {
    format!("{}{}{}", parent, SEPARATOR, field)
}

/// Synthetic primary key column of `table`; also the name of the parent-key
/// column in its child tables.
pub fn primary_key_column(table: &str) -> String {
    format!("{}{}id", table, SEPARATOR)
}

/// List ordinal column for collection level `level`.
pub fn ordinal_column(level: usize) -> String {
    format!("index{}{}", SEPARATOR, level)
}

/// Map key column for collection level `level`.
pub fn key_column(level: usize) -> String {
    format!("key{}{}", SEPARATOR, level)
}

/// Secondary index over the parent-key columns of `table`.
pub fn keys_index(table: &str) -> String {
    format!("{}{}{}keys", table, SEPARATOR, SEPARATOR)
}

/// Prefix of the object-store expression indexes on `table`.
pub fn object_index_prefix(table: &str) -> String {
    format!("{}{}{}idx{}", table, SEPARATOR, SEPARATOR, SEPARATOR)
}

/// Checks that `name` can serve as a root table name.
pub fn validate_table_name(name: &str) -> Result<()> {
    validate_identifier(name).map_err(|err| match err {
        TypeError::InvalidIdentifier { name, reason } => {
            MarshalError::InvalidTableName { name, reason }
        }
        other => MarshalError::Type(other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(child_table("Outer", "inner"), "Outer$inner");
        assert_eq!(primary_key_column("Outer$inner"), "Outer$inner$id");
        assert_eq!(ordinal_column(0), "index$0");
        assert_eq!(key_column(1), "key$1");
        assert_eq!(keys_index("Group$members"), "Group$members$$keys");
        assert_eq!(object_index_prefix("objects"), "objects$$idx$");
    }

    #[test]
    fn test_validate_table_name() {
        assert!(validate_table_name("people").is_ok());
        assert!(matches!(
            validate_table_name("people$x"),
            Err(MarshalError::InvalidTableName { .. })
        ));
        assert!(matches!(
            validate_table_name("drop table"),
            Err(MarshalError::InvalidTableName { .. })
        ));
    }
}
