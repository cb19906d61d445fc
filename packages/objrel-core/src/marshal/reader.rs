//! Unmarshaller: reassembles a value tree from rows.

use std::collections::BTreeMap;

use crate::error::{MarshalError, Result};
use crate::schema::naming;
use crate::storage::{quote_ident, Row, SqlValue, Storage};
use crate::types::{ScalarKind, TypeDescriptor};
use crate::value::Value;

use super::keys::KeyChain;
use super::{field_path, RowId};

/// Reads values from tables created by the schema compiler.
pub struct Unmarshaller<'a, S: Storage + ?Sized> {
    storage: &'a S,
}

impl<'a, S: Storage + ?Sized> Unmarshaller<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    /// Reads the value of shape `descriptor` stored in `table` under `keys`.
    pub fn get(&self, descriptor: &TypeDescriptor, table: &str, keys: &KeyChain) -> Result<Value> {
        self.get_at(descriptor, table, keys, table)
    }

    /// Reads the Scalar or Record root value stored in row `id` of `table`.
    pub fn get_by_id(&self, descriptor: &TypeDescriptor, table: &str, id: RowId) -> Result<Value> {
        if descriptor.is_collection() {
            return Err(MarshalError::Unrepresentable {
                path: table.to_string(),
                reason: format!("{} spans many rows and has no row id", descriptor.describe()),
            });
        }
        self.get(descriptor, table, &KeyChain::row(table, id))
    }

    /// Reads every value stored in root table `table`.
    ///
    /// Scalar and Record roots yield one value per root row in primary key
    /// order. A collection root is a single value spread over the whole table.
    pub fn get_all(&self, descriptor: &TypeDescriptor, table: &str) -> Result<Vec<Value>> {
        if descriptor.is_collection() {
            return Ok(vec![self.get(descriptor, table, &KeyChain::root())?]);
        }
        self.row_ids(table)?
            .into_iter()
            .map(|id| self.get_by_id(descriptor, table, id))
            .collect()
    }

    /// Primary keys of `table`, ascending.
    pub fn row_ids(&self, table: &str) -> Result<Vec<RowId>> {
        let pk = naming::primary_key_column(table);
        let sql = format!(
            "SELECT {} FROM {} ORDER BY 1",
            quote_ident(&pk),
            quote_ident(table)
        );
        self.storage
            .query(&sql, &[])?
            .iter()
            .map(|row| match row.get(&pk) {
                Some(SqlValue::Integer(id)) => Ok(*id),
                other => Err(mismatch(table, "int", other)),
            })
            .collect()
    }

    fn get_at(
        &self,
        descriptor: &TypeDescriptor,
        table: &str,
        keys: &KeyChain,
        path: &str,
    ) -> Result<Value> {
        match descriptor {
            TypeDescriptor::Scalar(kind) => {
                let row = self.single_row(table, &[naming::VALUE_COLUMN], keys)?;
                sql_to_scalar(*kind, row.get(naming::VALUE_COLUMN), path)
            }
            TypeDescriptor::List(element) => {
                let column = naming::ordinal_column(keys.depth());
                let mut items = Vec::new();
                for ordinal in self.distinct(table, &column, keys)? {
                    let ordinal = match ordinal {
                        SqlValue::Integer(ordinal) => ordinal,
                        other => {
                            return Err(mismatch(&field_path(path, &column), "int", Some(&other)))
                        }
                    };
                    let child_path = format!("{}[{}]", path, items.len());
                    items.push(self.get_at(element, table, &keys.with_ordinal(ordinal), &child_path)?);
                }
                Ok(Value::List(items))
            }
            TypeDescriptor::Map(value_ty) => {
                let column = naming::key_column(keys.depth());
                let mut entries = BTreeMap::new();
                for key in self.distinct(table, &column, keys)? {
                    let key = match key {
                        SqlValue::Text(key) => key,
                        other => {
                            return Err(mismatch(&field_path(path, &column), "str", Some(&other)))
                        }
                    };
                    let child_path = format!("{}{{{}}}", path, key);
                    let value = self.get_at(value_ty, table, &keys.with_map_key(&key), &child_path)?;
                    entries.insert(key, value);
                }
                Ok(Value::Map(entries))
            }
            TypeDescriptor::Record { fields, .. } => {
                let pk = naming::primary_key_column(table);
                let mut columns = vec![pk.as_str()];
                columns.extend(
                    fields
                        .iter()
                        .filter(|f| f.ty.is_scalar())
                        .map(|f| f.name.as_str()),
                );
                let row = self.single_row(table, &columns, keys)?;
                let id = match row.get(&pk) {
                    Some(SqlValue::Integer(id)) => *id,
                    other => return Err(mismatch(&field_path(path, &pk), "int", other)),
                };

                let child_keys = KeyChain::with_parent(table, id);
                let mut values = Vec::with_capacity(fields.len());
                for field in fields {
                    let fpath = field_path(path, &field.name);
                    let value = match &field.ty {
                        TypeDescriptor::Scalar(kind) => {
                            sql_to_scalar(*kind, row.get(&field.name), &fpath)?
                        }
                        ty => self.get_at(
                            ty,
                            &naming::child_table(table, &field.name),
                            &child_keys,
                            &fpath,
                        )?,
                    };
                    values.push((field.name.clone(), value));
                }
                Ok(Value::Record(values))
            }
        }
    }

    /// The one row of `table` matching `keys`.
    fn single_row(&self, table: &str, columns: &[&str], keys: &KeyChain) -> Result<Row> {
        let select: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
        let sql = format!(
            "SELECT {} FROM {}{}",
            select.join(", "),
            quote_ident(table),
            keys.where_clause()
        );
        let rows = self.storage.query(&sql, &keys.params())?;
        let count = rows.len();
        let mut rows = rows.into_iter();
        match (rows.next(), count) {
            (Some(row), 1) => Ok(row),
            (None, _) => Err(MarshalError::NotFound {
                table: table.to_string(),
                keys: keys.to_string(),
            }),
            (Some(_), rows) => Err(MarshalError::Corruption {
                table: table.to_string(),
                keys: keys.to_string(),
                rows,
            }),
        }
    }

    /// Distinct values of `column` among rows matching `keys`, ascending.
    fn distinct(&self, table: &str, column: &str, keys: &KeyChain) -> Result<Vec<SqlValue>> {
        let sql = format!(
            "SELECT DISTINCT {} FROM {}{} ORDER BY 1",
            quote_ident(column),
            quote_ident(table),
            keys.where_clause()
        );
        let rows = self.storage.query(&sql, &keys.params())?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.values().first().cloned())
            .collect())
    }
}

fn mismatch(path: &str, expected: &str, found: Option<&SqlValue>) -> MarshalError {
    MarshalError::TypeMismatch {
        path: path.to_string(),
        expected: expected.to_string(),
        found: found.map_or("nothing".to_string(), |v| v.to_string()),
    }
}

fn sql_to_scalar(kind: ScalarKind, value: Option<&SqlValue>, path: &str) -> Result<Value> {
    match (kind, value) {
        (ScalarKind::Integer, Some(SqlValue::Integer(i))) => Ok(Value::Integer(*i)),
        (ScalarKind::Text, Some(SqlValue::Text(s))) => Ok(Value::Text(s.clone())),
        (ScalarKind::Real, Some(SqlValue::Real(f))) => Ok(Value::Real(*f)),
        (ScalarKind::Boolean, Some(SqlValue::Integer(0))) => Ok(Value::Boolean(false)),
        (ScalarKind::Boolean, Some(SqlValue::Integer(1))) => Ok(Value::Boolean(true)),
        (kind, value) => Err(mismatch(path, kind.keyword(), value)),
    }
}
