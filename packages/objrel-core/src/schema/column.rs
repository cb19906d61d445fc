//! Column definition within a table.

use super::naming;
use crate::storage::quote_ident;
use crate::types::ScalarKind;

/// What a column stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRole {
    /// Synthetic primary key
    PrimaryKey,
    /// Primary key of the owning record row in `table`
    Parent { table: String },
    /// List position at one collection level
    Ordinal,
    /// Map key at one collection level
    MapKey,
    /// Scalar payload: a record field or the `value` column
    Value(ScalarKind),
}

/// Column definition within a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// Column role
    pub role: ColumnRole,
}

impl ColumnDef {
    pub fn primary_key(table: &str) -> Self {
        Self {
            name: naming::primary_key_column(table),
            role: ColumnRole::PrimaryKey,
        }
    }

    /// Parent-key column referencing the primary key of `parent_table`.
    pub fn parent(parent_table: &str) -> Self {
        Self {
            name: naming::primary_key_column(parent_table),
            role: ColumnRole::Parent {
                table: parent_table.to_string(),
            },
        }
    }

    pub fn ordinal(level: usize) -> Self {
        Self {
            name: naming::ordinal_column(level),
            role: ColumnRole::Ordinal,
        }
    }

    pub fn map_key(level: usize) -> Self {
        Self {
            name: naming::key_column(level),
            role: ColumnRole::MapKey,
        }
    }

    pub fn value(name: &str, kind: ScalarKind) -> Self {
        Self {
            name: name.to_string(),
            role: ColumnRole::Value(kind),
        }
    }

    /// Storage type of the column.
    pub fn storage_type(&self) -> &'static str {
        match &self.role {
            ColumnRole::PrimaryKey | ColumnRole::Parent { .. } | ColumnRole::Ordinal => "INTEGER",
            ColumnRole::MapKey => "TEXT",
            ColumnRole::Value(kind) => kind.storage_type(),
        }
    }

    /// True for columns that locate a row under its parent.
    pub fn is_collection_key(&self) -> bool {
        matches!(self.role, ColumnRole::Ordinal | ColumnRole::MapKey)
    }

    /// Column definition for `CREATE TABLE`.
    pub fn definition(&self) -> String {
        let name = quote_ident(&self.name);
        match &self.role {
            ColumnRole::PrimaryKey => format!("{} INTEGER PRIMARY KEY", name),
            ColumnRole::Parent { table } => format!(
                "{} INTEGER NOT NULL REFERENCES {} ({}) ON DELETE CASCADE",
                name,
                quote_ident(table),
                quote_ident(&self.name)
            ),
            ColumnRole::Ordinal | ColumnRole::MapKey => {
                format!("{} {} NOT NULL", name, self.storage_type())
            }
            ColumnRole::Value(kind) => format!("{} {}", name, kind.storage_type()),
        }
    }

    /// Column definition for `ALTER TABLE ... ADD COLUMN`, which cannot add
    /// `NOT NULL` columns without a default.
    pub fn added_definition(&self) -> String {
        let name = quote_ident(&self.name);
        match &self.role {
            ColumnRole::Parent { table } => format!(
                "{} INTEGER REFERENCES {} ({}) ON DELETE CASCADE",
                name,
                quote_ident(table),
                quote_ident(&self.name)
            ),
            ColumnRole::Ordinal | ColumnRole::MapKey => {
                format!("{} {}", name, self.storage_type())
            }
            _ => self.definition(),
        }
    }
}
