//! JSON conversion driven by type descriptors.

use std::collections::BTreeMap;

use serde_json::{json, Map, Number, Value as JsonValue};

use crate::error::{MarshalError, Result};
use crate::persist::Persist;
use crate::types::{ScalarKind, TypeDescriptor, TypeRegistry};
use crate::value::Value;

/// Converts a value of shape `descriptor` to JSON.
///
/// Records become objects with members in field order, lists become arrays
/// and maps become objects.
pub fn to_json(descriptor: &TypeDescriptor, value: &Value) -> Result<JsonValue> {
    match (descriptor, value) {
        (TypeDescriptor::Scalar(ScalarKind::Integer), Value::Integer(i)) => Ok(json!(i)),
        (TypeDescriptor::Scalar(ScalarKind::Text), Value::Text(s)) => Ok(json!(s)),
        (TypeDescriptor::Scalar(ScalarKind::Boolean), Value::Boolean(b)) => Ok(json!(b)),
        (TypeDescriptor::Scalar(ScalarKind::Real), Value::Real(f)) => Number::from_f64(*f)
            .map(JsonValue::Number)
            .ok_or_else(|| MarshalError::Json(format!("{} has no JSON representation", f))),
        (TypeDescriptor::List(element), Value::List(items)) => items
            .iter()
            .map(|item| to_json(element, item))
            .collect::<Result<Vec<_>>>()
            .map(JsonValue::Array),
        (TypeDescriptor::Map(value_ty), Value::Map(entries)) => {
            let mut obj = Map::new();
            for (key, entry) in entries {
                obj.insert(key.clone(), to_json(value_ty, entry)?);
            }
            Ok(JsonValue::Object(obj))
        }
        (TypeDescriptor::Record { fields, name }, Value::Record(values)) => {
            let mut obj = Map::new();
            for field in fields {
                let entry = value.field(&field.name).ok_or_else(|| {
                    MarshalError::Json(format!("{} value lacks field '{}'", name, field.name))
                })?;
                obj.insert(field.name.clone(), to_json(&field.ty, entry)?);
            }
            if values.len() > fields.len() {
                tracing::debug!("Dropped {} unknown fields of {}", values.len() - fields.len(), name);
            }
            Ok(JsonValue::Object(obj))
        }
        (descriptor, value) => Err(MarshalError::Json(format!(
            "expected {}, found {}",
            descriptor.describe(),
            value.kind_name()
        ))),
    }
}

/// Converts JSON to a value of shape `descriptor`.
///
/// Strict: missing record members, wrong JSON kinds and non-integral numbers
/// in integer positions fail. Unknown members of a record object are ignored.
pub fn from_json(descriptor: &TypeDescriptor, json: &JsonValue) -> Result<Value> {
    from_json_at(descriptor, json, "$")
}

fn from_json_at(descriptor: &TypeDescriptor, json: &JsonValue, path: &str) -> Result<Value> {
    match (descriptor, json) {
        (TypeDescriptor::Scalar(ScalarKind::Integer), JsonValue::Number(n)) => n
            .as_i64()
            .map(Value::Integer)
            .ok_or_else(|| MarshalError::Json(format!("{}: {} is not an int", path, n))),
        (TypeDescriptor::Scalar(ScalarKind::Real), JsonValue::Number(n)) => n
            .as_f64()
            .map(Value::Real)
            .ok_or_else(|| MarshalError::Json(format!("{}: {} is not a float", path, n))),
        (TypeDescriptor::Scalar(ScalarKind::Text), JsonValue::String(s)) => Ok(Value::Text(s.clone())),
        (TypeDescriptor::Scalar(ScalarKind::Boolean), JsonValue::Bool(b)) => Ok(Value::Boolean(*b)),
        (TypeDescriptor::List(element), JsonValue::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| from_json_at(element, item, &format!("{}[{}]", path, i)))
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        (TypeDescriptor::Map(value_ty), JsonValue::Object(obj)) => obj
            .iter()
            .map(|(key, entry)| -> Result<(String, Value)> {
                let entry = from_json_at(value_ty, entry, &format!("{}.{}", path, key))?;
                Ok((key.clone(), entry))
            })
            .collect::<Result<BTreeMap<_, _>>>()
            .map(Value::Map),
        (TypeDescriptor::Record { fields, .. }, JsonValue::Object(obj)) => {
            let mut values = Vec::with_capacity(fields.len());
            for field in fields {
                let field_path = format!("{}.{}", path, field.name);
                let entry = obj
                    .get(&field.name)
                    .ok_or_else(|| MarshalError::Json(format!("{}: missing", field_path)))?;
                values.push((field.name.clone(), from_json_at(&field.ty, entry, &field_path)?));
            }
            Ok(Value::Record(values))
        }
        (descriptor, json) => Err(MarshalError::Json(format!(
            "{}: expected {}, found {}",
            path,
            descriptor.describe(),
            json_kind(json)
        ))),
    }
}

fn json_kind(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Serializes a typed value to a JSON string.
pub fn to_string<T: Persist>(registry: &TypeRegistry, value: &T) -> Result<String> {
    let descriptor = registry.resolve_persist::<T>()?;
    Ok(serde_json::to_string(&to_json(&descriptor, &value.to_value())?)?)
}

/// Parses a typed value from a JSON string.
pub fn from_str<T: Persist>(registry: &TypeRegistry, s: &str) -> Result<T> {
    let descriptor = registry.resolve_persist::<T>()?;
    let json: JsonValue = serde_json::from_str(s)?;
    T::from_value(from_json(&descriptor, &json)?)
}
