//! Storage-engine contract and its SQLite binding.
//!
//! The marshalling core talks to the relational store only through
//! [`Storage`]: statements with `?` placeholders, rows indexable by column
//! name, the last generated primary key, and a column listing used for
//! existence-guarded schema creation. Cascade delete along declared foreign
//! keys is a required property of the store.

mod sqlite;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

pub use sqlite::SqliteStorage;

/// Storage-layer errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("Column '{column}' holds invalid UTF-8")]
    InvalidUtf8 { column: String },

    #[error("Column '{column}' holds an unsupported {kind} value")]
    UnsupportedValue { column: String, kind: &'static str },
}

/// Parameter and column value exchanged with the store.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Integer(i) => write!(f, "{}", i),
            SqlValue::Real(r) => write!(f, "{}", r),
            SqlValue::Text(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

/// Result row, indexable by column name.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    /// Returns the value of column `name`, if the row has it.
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|i| self.values.get(i))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }
}

/// Quotes an identifier for interpolation into a statement.
///
/// Only validated names reach this function; quoting keeps the reserved
/// `$` separator and keyword-like field names legal.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Relational store consumed by the schema compiler, writer and reader.
///
/// Implementations block the calling thread for every call.
pub trait Storage {
    /// Runs a DDL/DML statement and returns the number of rows affected.
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize, StorageError>;

    /// Runs a query and returns all rows.
    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, StorageError>;

    /// Primary key generated by the most recent insert.
    fn last_insert_id(&self) -> i64;

    /// Column names of `table`, empty if the table does not exist.
    fn table_columns(&self, table: &str) -> Result<Vec<String>, StorageError>;

    fn begin_savepoint(&self, name: &str) -> Result<(), StorageError> {
        self.execute(&format!("SAVEPOINT {}", quote_ident(name)), &[])
            .map(|_| ())
    }

    fn release_savepoint(&self, name: &str) -> Result<(), StorageError> {
        self.execute(&format!("RELEASE SAVEPOINT {}", quote_ident(name)), &[])
            .map(|_| ())
    }

    /// Undoes everything since `begin_savepoint` and closes the savepoint.
    fn rollback_savepoint(&self, name: &str) -> Result<(), StorageError> {
        self.execute(&format!("ROLLBACK TO SAVEPOINT {}", quote_ident(name)), &[])?;
        self.release_savepoint(name)
    }
}

/// Runs `f` inside a savepoint so its writes become visible as one unit.
pub(crate) fn in_savepoint<S, T, F>(storage: &S, name: &str, f: F) -> crate::error::Result<T>
where
    S: Storage + ?Sized,
    F: FnOnce() -> crate::error::Result<T>,
{
    storage.begin_savepoint(name)?;
    match f() {
        Ok(value) => {
            storage.release_savepoint(name)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = storage.rollback_savepoint(name) {
                tracing::error!("Rollback of savepoint {} failed: {}", name, rollback_err);
            }
            Err(err)
        }
    }
}
