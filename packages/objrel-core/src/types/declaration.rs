//! Record declarations and the TOML declaration file format.
//!
//! ```toml
//! [types.Address]
//! fields = [
//!     { name = "street", type = "str" },
//!     { name = "number", type = "int" },
//! ]
//!
//! [types.Person]
//! fields = [
//!     { name = "name", type = "str" },
//!     { name = "address", type = "Address" },
//!     { name = "hobbies", type = "list<str>" },
//! ]
//! ```

use std::collections::HashSet;
use std::path::Path;

use super::error::TypeError;
use super::type_expr::TypeExpr;
use super::type_registry::TypeRegistry;

/// Checks that `name` is usable as a record, field or root table name.
///
/// Identifiers are `[A-Za-z_][A-Za-z0-9_]*`. The table-name separator `$`
/// is thereby never part of a valid identifier.
pub fn validate_identifier(name: &str) -> Result<(), TypeError> {
    let mut chars = name.chars();
    let first = chars.next().ok_or_else(|| TypeError::InvalidIdentifier {
        name: name.to_string(),
        reason: "empty".to_string(),
    })?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(TypeError::InvalidIdentifier {
            name: name.to_string(),
            reason: "must start with a letter or '_'".to_string(),
        });
    }
    if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
        return Err(TypeError::InvalidIdentifier {
            name: name.to_string(),
            reason: format!("invalid character '{}'", bad),
        });
    }
    Ok(())
}

/// Declared record type: a name and its fields in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDecl {
    pub name: String,
    pub fields: Vec<(String, TypeExpr)>,
}

impl RecordDecl {
    /// Creates a declaration, validating the record and field names.
    pub fn new(name: impl Into<String>, fields: Vec<(String, TypeExpr)>) -> Result<Self, TypeError> {
        let name = name.into();
        validate_identifier(&name)?;

        // Column names are case-insensitive in the store
        let mut seen = HashSet::new();
        for (field, _) in &fields {
            validate_identifier(field)?;
            if !seen.insert(field.to_ascii_lowercase()) {
                return Err(TypeError::DuplicateField {
                    record: name.clone(),
                    field: field.clone(),
                });
            }
        }

        Ok(Self { name, fields })
    }
}

/// Parser for TOML declaration files.
pub struct DeclarationParser;

impl DeclarationParser {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Vec<RecordDecl>, TypeError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            TypeError::Declaration(format!(
                "failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(toml_str: &str) -> Result<Vec<RecordDecl>, TypeError> {
        let document: toml::Value = toml::from_str(toml_str)
            .map_err(|e| TypeError::Declaration(format!("TOML parse error: {}", e)))?;

        let types = document
            .get("types")
            .and_then(|v| v.as_table())
            .ok_or_else(|| TypeError::Declaration("missing [types] section".into()))?;

        let mut decls = Vec::with_capacity(types.len());
        for (type_name, section) in types {
            let field_array = section
                .get("fields")
                .and_then(|v| v.as_array())
                .ok_or_else(|| {
                    TypeError::Declaration(format!("type '{}' is missing 'fields'", type_name))
                })?;

            let mut fields = Vec::with_capacity(field_array.len());
            for field_val in field_array {
                let name = field_val
                    .get("name")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| {
                        TypeError::Declaration(format!("field in '{}' missing 'name'", type_name))
                    })?;
                let type_str = field_val
                    .get("type")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| {
                        TypeError::Declaration(format!(
                            "field '{}.{}' missing 'type'",
                            type_name, name
                        ))
                    })?;
                fields.push((name.to_string(), TypeExpr::parse(type_str)?));
            }

            decls.push(RecordDecl::new(type_name.clone(), fields)?);
        }

        Ok(decls)
    }

    /// Parses `toml_str` and registers every declaration in `registry`.
    pub fn load_into(registry: &TypeRegistry, toml_str: &str) -> Result<usize, TypeError> {
        let decls = Self::from_toml(toml_str)?;
        let count = decls.len();
        for decl in decls {
            registry.register(decl)?;
        }
        Ok(count)
    }
}
