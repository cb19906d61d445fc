//! Marshaller: writes a value tree as rows.

use crate::error::{MarshalError, Result};
use crate::schema::naming;
use crate::storage::{quote_ident, SqlValue, Storage};
use crate::types::{FieldDescriptor, ScalarKind, TypeDescriptor};
use crate::value::Value;

use super::keys::KeyChain;
use super::{field_path, RowId};

/// Writes values into tables created by the schema compiler.
///
/// The caller is responsible for atomicity; a failed insert may leave the
/// rows written before the failure in place unless it runs inside a
/// savepoint.
pub struct Marshaller<'a, S: Storage + ?Sized> {
    storage: &'a S,
}

impl<'a, S: Storage + ?Sized> Marshaller<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    /// Inserts `value` of shape `descriptor` into `table` under `keys`.
    ///
    /// Returns the generated primary key for Scalar and Record values, which
    /// occupy exactly one row of `table`; collections return `None`.
    pub fn insert(
        &self,
        descriptor: &TypeDescriptor,
        table: &str,
        value: &Value,
        keys: &KeyChain,
    ) -> Result<Option<RowId>> {
        self.insert_at(descriptor, table, value, keys, table)
    }

    fn insert_at(
        &self,
        descriptor: &TypeDescriptor,
        table: &str,
        value: &Value,
        keys: &KeyChain,
        path: &str,
    ) -> Result<Option<RowId>> {
        match (descriptor, value) {
            (TypeDescriptor::Scalar(kind), value) => {
                let column = (naming::VALUE_COLUMN, scalar_to_sql(*kind, value, path)?);
                self.insert_row(table, keys, vec![column]).map(Some)
            }
            (TypeDescriptor::List(element), Value::List(items)) => {
                if items.is_empty() {
                    check_empty_collection(keys, path)?;
                    return Ok(None);
                }
                let base = self.next_ordinal(table, keys)?;
                for (i, item) in items.iter().enumerate() {
                    let child_keys = keys.with_ordinal(base + i as i64);
                    let child_path = format!("{}[{}]", path, i);
                    self.insert_at(element, table, item, &child_keys, &child_path)?;
                }
                Ok(None)
            }
            (TypeDescriptor::Map(value_ty), Value::Map(entries)) => {
                if entries.is_empty() {
                    check_empty_collection(keys, path)?;
                    return Ok(None);
                }
                for (key, entry) in entries {
                    let child_keys = keys.with_map_key(key);
                    let child_path = format!("{}{{{}}}", path, key);
                    self.insert_at(value_ty, table, entry, &child_keys, &child_path)?;
                }
                Ok(None)
            }
            (TypeDescriptor::Record { fields, .. }, Value::Record(values)) => {
                check_field_set(fields, values, path)?;

                let mut columns = Vec::new();
                for field in fields {
                    if let TypeDescriptor::Scalar(kind) = &field.ty {
                        let value = field_value(values, &field.name, path)?;
                        let sql = scalar_to_sql(*kind, value, &field_path(path, &field.name))?;
                        columns.push((field.name.as_str(), sql));
                    }
                }
                let id = self.insert_row(table, keys, columns)?;

                let child_keys = KeyChain::with_parent(table, id);
                for field in fields.iter().filter(|f| !f.ty.is_scalar()) {
                    let value = field_value(values, &field.name, path)?;
                    self.insert_at(
                        &field.ty,
                        &naming::child_table(table, &field.name),
                        value,
                        &child_keys,
                        &field_path(path, &field.name),
                    )?;
                }
                tracing::trace!("Inserted row group {} into '{}'", id, table);
                Ok(Some(id))
            }
            (descriptor, value) => Err(MarshalError::TypeMismatch {
                path: path.to_string(),
                expected: descriptor.describe(),
                found: value.kind_name().to_string(),
            }),
        }
    }

    fn insert_row(
        &self,
        table: &str,
        keys: &KeyChain,
        values: Vec<(&str, SqlValue)>,
    ) -> Result<RowId> {
        let mut columns: Vec<String> = keys.columns().map(quote_ident).collect();
        let mut params = keys.params();
        for (column, value) in values {
            columns.push(quote_ident(column));
            params.push(value);
        }

        let sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table))
        } else {
            let placeholders = vec!["?"; columns.len()].join(", ");
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(table),
                columns.join(", "),
                placeholders
            )
        };
        self.storage.execute(&sql, &params)?;
        Ok(self.storage.last_insert_id())
    }

    /// First free ordinal of the list at `keys`, read once per list insert.
    fn next_ordinal(&self, table: &str, keys: &KeyChain) -> Result<i64> {
        let column = naming::ordinal_column(keys.depth());
        let sql = format!(
            "SELECT COALESCE(MAX({}) + 1, 0) AS \"next\" FROM {}{}",
            quote_ident(&column),
            quote_ident(table),
            keys.where_clause()
        );
        let rows = self.storage.query(&sql, &keys.params())?;
        match rows.first().and_then(|row| row.get("next")) {
            Some(SqlValue::Integer(next)) => Ok(*next),
            other => Err(MarshalError::TypeMismatch {
                path: format!("{}.{}", table, column),
                expected: "int".to_string(),
                found: other.map_or("nothing".to_string(), |v| v.to_string()),
            }),
        }
    }
}

/// An empty collection directly inside another collection owns no rows and
/// would vanish on read.
fn check_empty_collection(keys: &KeyChain, path: &str) -> Result<()> {
    if keys.depth() > 0 {
        return Err(MarshalError::Unrepresentable {
            path: path.to_string(),
            reason: "empty collection nested directly in a list or map".to_string(),
        });
    }
    Ok(())
}

fn check_field_set(fields: &[FieldDescriptor], values: &[(String, Value)], path: &str) -> Result<()> {
    for (i, (name, value)) in values.iter().enumerate() {
        if !fields.iter().any(|f| &f.name == name) {
            return Err(MarshalError::TypeMismatch {
                path: field_path(path, name),
                expected: "no such field".to_string(),
                found: value.kind_name().to_string(),
            });
        }
        if values[..i].iter().any(|(seen, _)| seen == name) {
            return Err(MarshalError::TypeMismatch {
                path: field_path(path, name),
                expected: "one value".to_string(),
                found: "repeated field".to_string(),
            });
        }
    }
    Ok(())
}

fn field_value<'v>(values: &'v [(String, Value)], name: &str, path: &str) -> Result<&'v Value> {
    values
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v)
        .ok_or_else(|| MarshalError::TypeMismatch {
            path: field_path(path, name),
            expected: "field".to_string(),
            found: "nothing".to_string(),
        })
}

fn scalar_to_sql(kind: ScalarKind, value: &Value, path: &str) -> Result<SqlValue> {
    match (kind, value) {
        (ScalarKind::Integer, Value::Integer(i)) => Ok(SqlValue::Integer(*i)),
        (ScalarKind::Text, Value::Text(s)) => Ok(SqlValue::Text(s.clone())),
        (ScalarKind::Real, Value::Real(f)) if f.is_nan() => Err(MarshalError::Unrepresentable {
            path: path.to_string(),
            reason: "NaN is stored as NULL".to_string(),
        }),
        (ScalarKind::Real, Value::Real(f)) => Ok(SqlValue::Real(*f)),
        (ScalarKind::Boolean, Value::Boolean(b)) => Ok(SqlValue::Integer(i64::from(*b))),
        (kind, value) => Err(MarshalError::TypeMismatch {
            path: path.to_string(),
            expected: kind.keyword().to_string(),
            found: value.kind_name().to_string(),
        }),
    }
}
