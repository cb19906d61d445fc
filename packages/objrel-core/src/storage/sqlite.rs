//! SQLite implementation of [`Storage`].

use std::sync::Arc;

use rusqlite::types::{ToSqlOutput, Value as SqliteValue, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};

use super::{Row, SqlValue, Storage, StorageError};
use crate::config::EngineConfig;

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(SqliteValue::Null),
            SqlValue::Integer(i) => ToSqlOutput::Owned(SqliteValue::Integer(*i)),
            SqlValue::Real(f) => ToSqlOutput::Owned(SqliteValue::Real(*f)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

fn convert(value: ValueRef<'_>, column: &str) -> Result<SqlValue, StorageError> {
    match value {
        ValueRef::Null => Ok(SqlValue::Null),
        ValueRef::Integer(i) => Ok(SqlValue::Integer(i)),
        ValueRef::Real(f) => Ok(SqlValue::Real(f)),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|s| SqlValue::Text(s.to_string()))
            .map_err(|_| StorageError::InvalidUtf8 {
                column: column.to_string(),
            }),
        ValueRef::Blob(_) => Err(StorageError::UnsupportedValue {
            column: column.to_string(),
            kind: "blob",
        }),
    }
}

/// SQLite-backed [`Storage`].
///
/// Foreign keys are switched on at open time so that deleting a root row
/// cascades through its row group. The connection is not `Sync`; a storage
/// handle serves one thread at a time.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the database described by `config`.
    pub fn open(config: &EngineConfig) -> Result<Self, StorageError> {
        let conn = if config.is_in_memory() {
            Connection::open_in_memory()?
        } else {
            let conn = Connection::open(&config.database_path)?;
            if config.wal_mode {
                let mode: String =
                    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
                tracing::debug!("Journal mode for {}: {}", config.database_path.display(), mode);
            }
            conn
        };
        conn.busy_timeout(config.busy_timeout())?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self { conn })
    }

    /// Opens an in-memory database with default settings.
    pub fn in_memory() -> Result<Self, StorageError> {
        Self::open(&EngineConfig::in_memory())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Storage for SqliteStorage {
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize, StorageError> {
        tracing::trace!("execute: {}", sql);
        let mut stmt = self.conn.prepare_cached(sql)?;
        Ok(stmt.execute(params_from_iter(params.iter()))?)
    }

    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, StorageError> {
        tracing::trace!("query: {}", sql);
        let mut stmt = self.conn.prepare_cached(sql)?;
        let columns: Arc<[String]> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for (i, column) in columns.iter().enumerate() {
                values.push(convert(row.get_ref(i)?, column)?);
            }
            out.push(Row::new(Arc::clone(&columns), values));
        }
        Ok(out)
    }

    fn last_insert_id(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    fn table_columns(&self, table: &str) -> Result<Vec<String>, StorageError> {
        let rows = self.query(
            "SELECT name FROM pragma_table_info(?)",
            &[SqlValue::Text(table.to_string())],
        )?;
        Ok(rows
            .into_iter()
            .filter_map(|row| match row.get("name") {
                Some(SqlValue::Text(name)) => Some(name.clone()),
                _ => None,
            })
            .collect())
    }
}
