//! Whole-instance JSON storage with expression indexes on attribute paths.
//!
//! The object store keeps each value as one JSON document in a single table
//! and relies on SQLite's `json_extract` for indexed lookups. It trades the
//! relational layout for cheap writes of deep values.

use std::sync::Arc;

use crate::error::{MarshalError, Result};
use crate::json::{from_json, to_json};
use crate::marshal::RowId;
use crate::schema::naming;
use crate::storage::{quote_ident, SqlValue, Storage};
use crate::types::{validate_identifier, ScalarKind, TypeDescriptor};
use crate::value::Value;

const JSON_COLUMN: &str = "json";

/// JSON document table for one root type.
pub struct ObjectStore<'a, S: Storage + ?Sized> {
    storage: &'a S,
    descriptor: Arc<TypeDescriptor>,
    table: String,
    indexes: Vec<String>,
}

impl<'a, S: Storage + ?Sized> ObjectStore<'a, S> {
    /// Opens the document table `table`, creating it if needed.
    pub fn open(storage: &'a S, descriptor: Arc<TypeDescriptor>, table: &str) -> Result<Self> {
        naming::validate_table_name(table)?;
        storage.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} ({} INTEGER PRIMARY KEY, {} TEXT NOT NULL)",
                quote_ident(table),
                quote_ident(&naming::primary_key_column(table)),
                quote_ident(JSON_COLUMN)
            ),
            &[],
        )?;

        let prefix = naming::object_index_prefix(table);
        let mut indexes: Vec<String> = storage
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = ?",
                &[SqlValue::Text(table.to_string())],
            )?
            .into_iter()
            .filter_map(|row| match row.get("name") {
                Some(SqlValue::Text(name)) => name.strip_prefix(&prefix).map(String::from),
                _ => None,
            })
            .collect();
        indexes.sort();

        Ok(Self {
            storage,
            descriptor,
            table: table.to_string(),
            indexes,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn insert(&self, value: &Value) -> Result<RowId> {
        let json = serde_json::to_string(&to_json(&self.descriptor, value)?)?;
        self.storage.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES (?)",
                quote_ident(&self.table),
                quote_ident(JSON_COLUMN)
            ),
            &[SqlValue::Text(json)],
        )?;
        Ok(self.storage.last_insert_id())
    }

    pub fn fetch(&self, id: RowId) -> Result<Value> {
        let pk = naming::primary_key_column(&self.table);
        let rows = self.select(
            &format!(" WHERE {} = ?", quote_ident(&pk)),
            &[SqlValue::Integer(id)],
        )?;
        rows.into_iter()
            .next()
            .ok_or_else(|| MarshalError::NotFound {
                table: self.table.clone(),
                keys: format!("{{{}={}}}", pk, id),
            })
    }

    /// Every stored value in insertion order.
    pub fn fetch_all(&self) -> Result<Vec<Value>> {
        self.select("", &[])
    }

    /// Creates an expression index on the dotted attribute `path`.
    ///
    /// Returns `false` without touching the store if the index already exists.
    pub fn ensure_index(&mut self, path: &str) -> Result<bool> {
        validate_path(&self.descriptor, path)?;
        if self.indexes.iter().any(|p| p == path) {
            tracing::warn!("Index on '{}' of '{}' already exists", path, self.table);
            return Ok(false);
        }
        self.storage.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                quote_ident(&format!("{}{}", naming::object_index_prefix(&self.table), path)),
                quote_ident(&self.table),
                extract_expr(path)
            ),
            &[],
        )?;
        tracing::info!("Created index on '{}' of '{}'", path, self.table);
        self.indexes.push(path.to_string());
        self.indexes.sort();
        Ok(true)
    }

    /// Values whose attribute at `path` equals `value`.
    pub fn filter(&self, path: &str, value: &Value) -> Result<Vec<Value>> {
        let kind = validate_path(&self.descriptor, path)?;
        let param = match (kind, value) {
            (ScalarKind::Integer, Value::Integer(i)) => SqlValue::Integer(*i),
            (ScalarKind::Real, Value::Real(f)) => SqlValue::Real(*f),
            (ScalarKind::Text, Value::Text(s)) => SqlValue::Text(s.clone()),
            (ScalarKind::Boolean, Value::Boolean(b)) => SqlValue::Integer(i64::from(*b)),
            (kind, value) => {
                return Err(MarshalError::TypeMismatch {
                    path: path.to_string(),
                    expected: kind.keyword().to_string(),
                    found: value.kind_name().to_string(),
                })
            }
        };
        self.select(&format!(" WHERE {} = ?", extract_expr(path)), &[param])
    }

    /// Attribute paths indexed so far, sorted.
    pub fn indexes(&self) -> &[String] {
        &self.indexes
    }

    fn select(&self, filter: &str, params: &[SqlValue]) -> Result<Vec<Value>> {
        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY {}",
            quote_ident(JSON_COLUMN),
            quote_ident(&self.table),
            filter,
            quote_ident(&naming::primary_key_column(&self.table))
        );
        self.storage
            .query(&sql, params)?
            .iter()
            .map(|row| match row.get(JSON_COLUMN) {
                Some(SqlValue::Text(text)) => {
                    let json: serde_json::Value = serde_json::from_str(text)?;
                    from_json(&self.descriptor, &json)
                }
                other => Err(MarshalError::TypeMismatch {
                    path: format!("{}.{}", self.table, JSON_COLUMN),
                    expected: "str".to_string(),
                    found: other.map_or("nothing".to_string(), |v| v.to_string()),
                }),
            })
            .collect()
    }
}

/// Path segments are validated identifiers, so the literal is safe to inline.
fn extract_expr(path: &str) -> String {
    format!("json_extract({}, '$.{}')", quote_ident(JSON_COLUMN), path)
}

/// Walks `path` through record fields and returns the scalar kind it reaches.
fn validate_path(descriptor: &TypeDescriptor, path: &str) -> Result<ScalarKind> {
    let invalid = |reason: String| MarshalError::InvalidPath {
        path: path.to_string(),
        reason,
    };

    let mut current = descriptor;
    for segment in path.split('.') {
        validate_identifier(segment).map_err(|e| invalid(e.to_string()))?;
        let fields = current
            .fields()
            .ok_or_else(|| invalid(format!("{} has no fields", current.describe())))?;
        current = &fields
            .iter()
            .find(|f| f.name == segment)
            .ok_or_else(|| invalid(format!("no field '{}'", segment)))?
            .ty;
    }
    match current {
        TypeDescriptor::Scalar(kind) => Ok(*kind),
        other => Err(invalid(format!("ends at {}, not a scalar", other.describe()))),
    }
}
