//! Table definitions and the compiled schema plan.
//!
//! Each table has:
//! - A synthetic integer primary key
//! - Key columns locating a row under its parent (parent key, ordinals, map keys)
//! - Value columns holding scalar payload

use crate::storage::quote_ident;

use super::column::ColumnDef;
use super::naming;

/// Table definition produced by the schema compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    /// Table name
    pub name: String,
    /// Synthetic primary key column
    pub primary_key: ColumnDef,
    /// Parent-key column followed by ordinal and map-key columns, outermost first
    pub key_columns: Vec<ColumnDef>,
    /// Scalar payload columns
    pub value_columns: Vec<ColumnDef>,
}

impl TableDef {
    pub fn new(name: &str, key_columns: Vec<ColumnDef>, value_columns: Vec<ColumnDef>) -> Self {
        Self {
            name: name.to_string(),
            primary_key: ColumnDef::primary_key(name),
            key_columns,
            value_columns,
        }
    }

    /// All columns in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnDef> {
        std::iter::once(&self.primary_key)
            .chain(self.key_columns.iter())
            .chain(self.value_columns.iter())
    }

    /// Number of ordinal and map-key columns.
    pub fn collection_depth(&self) -> usize {
        self.key_columns
            .iter()
            .filter(|c| c.is_collection_key())
            .count()
    }

    pub fn create_statement(&self) -> String {
        let columns: Vec<String> = self.columns().map(ColumnDef::definition).collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_ident(&self.name),
            columns.join(", ")
        )
    }

    /// Secondary index over the key columns; root tables have none.
    pub fn index_statement(&self) -> Option<String> {
        if self.key_columns.is_empty() {
            return None;
        }
        let columns: Vec<String> = self
            .key_columns
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect();
        Some(format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            quote_ident(&naming::keys_index(&self.name)),
            quote_ident(&self.name),
            columns.join(", ")
        ))
    }
}

/// Every table needed to store one root type, parents before children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaPlan {
    /// Root table name
    pub root: String,
    /// Table definitions; the root table comes first
    pub tables: Vec<TableDef>,
}

impl SchemaPlan {
    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn root_table(&self) -> Option<&TableDef> {
        self.tables.first()
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// DDL statements that create the schema, in execution order.
    pub fn ddl(&self) -> Vec<String> {
        let mut statements = Vec::with_capacity(self.tables.len() * 2);
        for table in &self.tables {
            statements.push(table.create_statement());
            if let Some(index) = table.index_statement() {
                statements.push(index);
            }
        }
        statements
    }
}
