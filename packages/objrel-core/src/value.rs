//! Dynamic instance tree mirroring [`TypeDescriptor`](crate::types::TypeDescriptor).

use std::collections::BTreeMap;

use crate::error::{MarshalError, Result};
use crate::persist::Persist;

/// Value representation for an instance of a described type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Text(String),
    Real(f64),
    Boolean(bool),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Fields in declaration order
    Record(Vec<(String, Value)>),
}

impl Value {
    /// Name of the value's variant, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "int",
            Value::Text(_) => "str",
            Value::Real(_) => "float",
            Value::Boolean(_) => "bool",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
        }
    }

    /// Looks up a record field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Record(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

/// Helper for typed record construction from [`Value::Record`].
///
/// Used by [`persist_record!`](crate::persist_record) to pull fields out by
/// name.
pub struct RecordFields {
    record: &'static str,
    fields: Vec<(String, Value)>,
}

impl RecordFields {
    pub fn from_value(value: Value, record: &'static str) -> Result<Self> {
        match value {
            Value::Record(fields) => Ok(Self { record, fields }),
            other => Err(MarshalError::TypeMismatch {
                path: record.to_string(),
                expected: record.to_string(),
                found: other.kind_name().to_string(),
            }),
        }
    }

    /// Removes field `name` and converts it to `T`.
    pub fn take<T: Persist>(&mut self, name: &str) -> Result<T> {
        let index = self
            .fields
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| MarshalError::TypeMismatch {
                path: format!("{}.{}", self.record, name),
                expected: "field".to_string(),
                found: "nothing".to_string(),
            })?;
        let (_, value) = self.fields.swap_remove(index);
        T::from_value(value)
    }
}
