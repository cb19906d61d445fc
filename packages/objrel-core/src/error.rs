//! Marshalling error types.

use thiserror::Error;

use crate::storage::StorageError;
use crate::types::TypeError;

/// Errors surfaced by compile, insert and get operations.
///
/// None of these are retried internally; every failure aborts the
/// enclosing top-level call.
#[derive(Error, Debug)]
pub enum MarshalError {
    /// Type declaration or resolution failure
    #[error(transparent)]
    Type(#[from] TypeError),

    /// Storage engine failure, passed through unmodified
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A query expected exactly one row and found none
    #[error("No row in '{table}' matching {keys}")]
    NotFound { table: String, keys: String },

    /// A query expected exactly one row and found several
    #[error("Corrupted row group: {rows} rows in '{table}' match {keys}")]
    Corruption {
        table: String,
        keys: String,
        rows: usize,
    },

    /// Value does not match its descriptor
    #[error("Type mismatch at '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    /// Value has no row representation under the compiled schema
    #[error("Cannot store value at '{path}': {reason}")]
    Unrepresentable { path: String, reason: String },

    #[error("Invalid table name '{name}': {reason}")]
    InvalidTableName { name: String, reason: String },

    /// Attribute path does not lead to a scalar
    #[error("Invalid attribute path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for MarshalError {
    fn from(err: serde_json::Error) -> Self {
        MarshalError::Json(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MarshalError>;
