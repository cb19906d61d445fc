//! Ordered parent-key chain locating a row group.

use std::fmt;

use crate::schema::naming;
use crate::storage::{quote_ident, SqlValue};

/// Ordered `(column, value)` pairs identifying where a value lives.
///
/// A chain starts empty at a root table, gains an ordinal or map-key column
/// for every collection level, and restarts with a single parent-key column
/// at every record boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyChain {
    entries: Vec<(String, SqlValue)>,
    depth: usize,
}

impl KeyChain {
    /// Empty chain for a root table.
    pub fn root() -> Self {
        Self::default()
    }

    /// Chain for the child tables of row `id` in record table `table`.
    pub fn with_parent(table: &str, id: i64) -> Self {
        Self {
            entries: vec![(naming::primary_key_column(table), SqlValue::Integer(id))],
            depth: 0,
        }
    }

    /// Chain selecting row `id` of `table` itself by its primary key.
    ///
    /// The primary key of a table and the parent-key column of its children
    /// share a name, so this is the same chain as [`KeyChain::with_parent`].
    pub fn row(table: &str, id: i64) -> Self {
        Self::with_parent(table, id)
    }

    /// Extends the chain by one list level.
    pub fn with_ordinal(&self, ordinal: i64) -> Self {
        self.extended(naming::ordinal_column(self.depth), SqlValue::Integer(ordinal))
    }

    /// Extends the chain by one map level.
    pub fn with_map_key(&self, key: &str) -> Self {
        self.extended(naming::key_column(self.depth), SqlValue::Text(key.to_string()))
    }

    fn extended(&self, column: String, value: SqlValue) -> Self {
        let mut entries = self.entries.clone();
        entries.push((column, value));
        Self {
            entries,
            depth: self.depth + 1,
        }
    }

    /// Number of collection levels since the last record boundary.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    /// Bound parameters, in column order.
    pub fn params(&self) -> Vec<SqlValue> {
        self.entries.iter().map(|(_, v)| v.clone()).collect()
    }

    /// ` WHERE "c1" = ? AND ...`, or an empty string for an empty chain.
    pub fn where_clause(&self) -> String {
        if self.entries.is_empty() {
            return String::new();
        }
        let predicates: Vec<String> = self
            .entries
            .iter()
            .map(|(c, _)| format!("{} = ?", quote_ident(c)))
            .collect();
        format!(" WHERE {}", predicates.join(" AND "))
    }
}

impl fmt::Display for KeyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (column, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", column, value)?;
        }
        f.write_str("}")
    }
}
