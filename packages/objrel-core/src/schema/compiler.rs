//! Derives the table set for a root type and applies it to a store.

use crate::error::Result;
use crate::storage::{quote_ident, Storage};
use crate::types::TypeDescriptor;

use super::column::ColumnDef;
use super::naming;
use super::table::{SchemaPlan, TableDef};

/// Schema compiler.
///
/// Planning is pure; applying a plan only issues existence-guarded DDL, so
/// compiling the same type against the same table name any number of times
/// leaves the store unchanged after the first run.
pub struct SchemaCompiler;

impl SchemaCompiler {
    /// Computes the tables storing `descriptor` under root table `table`.
    pub fn plan(descriptor: &TypeDescriptor, table: &str) -> Result<SchemaPlan> {
        naming::validate_table_name(table)?;
        let mut tables = Vec::new();
        plan_node(descriptor, table, Vec::new(), &mut tables);
        Ok(SchemaPlan {
            root: table.to_string(),
            tables,
        })
    }

    /// Plans and applies the schema for `descriptor`.
    pub fn compile<S: Storage + ?Sized>(
        storage: &S,
        descriptor: &TypeDescriptor,
        table: &str,
    ) -> Result<SchemaPlan> {
        let plan = Self::plan(descriptor, table)?;
        Self::apply(storage, &plan)?;
        Ok(plan)
    }

    /// Creates missing tables, columns and indexes of `plan`.
    pub fn apply<S: Storage + ?Sized>(storage: &S, plan: &SchemaPlan) -> Result<()> {
        for table in &plan.tables {
            let existing = storage.table_columns(&table.name)?;
            if existing.is_empty() {
                storage.execute(&table.create_statement(), &[])?;
                tracing::debug!("Created table '{}'", table.name);
            } else {
                for column in table.columns() {
                    if existing.iter().any(|name| name == &column.name) {
                        continue;
                    }
                    let sql = format!(
                        "ALTER TABLE {} ADD COLUMN {}",
                        quote_ident(&table.name),
                        column.added_definition()
                    );
                    storage.execute(&sql, &[])?;
                    tracing::info!("Added column '{}' to table '{}'", column.name, table.name);
                }
            }
            if let Some(index) = table.index_statement() {
                storage.execute(&index, &[])?;
            }
        }
        tracing::debug!(
            "Compiled schema for '{}' ({} tables)",
            plan.root,
            plan.tables.len()
        );
        Ok(())
    }
}

fn plan_node(
    descriptor: &TypeDescriptor,
    table: &str,
    mut keys: Vec<ColumnDef>,
    out: &mut Vec<TableDef>,
) {
    let level = keys.iter().filter(|c| c.is_collection_key()).count();
    match descriptor {
        TypeDescriptor::Scalar(kind) => {
            let value = ColumnDef::value(naming::VALUE_COLUMN, *kind);
            out.push(TableDef::new(table, keys, vec![value]));
        }
        TypeDescriptor::List(element) => {
            keys.push(ColumnDef::ordinal(level));
            plan_node(element, table, keys, out);
        }
        TypeDescriptor::Map(value) => {
            keys.push(ColumnDef::map_key(level));
            plan_node(value, table, keys, out);
        }
        TypeDescriptor::Record { fields, .. } => {
            let value_columns = fields
                .iter()
                .filter_map(|field| match &field.ty {
                    TypeDescriptor::Scalar(kind) => Some(ColumnDef::value(&field.name, *kind)),
                    _ => None,
                })
                .collect();
            out.push(TableDef::new(table, keys, value_columns));

            // A record boundary resets the key chain to the record's own key
            for field in fields.iter().filter(|f| !f.ty.is_scalar()) {
                let child = naming::child_table(table, &field.name);
                plan_node(&field.ty, &child, vec![ColumnDef::parent(table)], out);
            }
        }
    }
}
