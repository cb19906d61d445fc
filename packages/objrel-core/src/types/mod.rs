//! Type system: declared type expressions, record declarations and the
//! resolved [`TypeDescriptor`] tree consumed by the compiler, writer and reader.

mod declaration;
mod error;
mod type_expr;
mod type_registry;

use std::fmt;

pub use declaration::{validate_identifier, DeclarationParser, RecordDecl};
pub use error::TypeError;
pub use type_expr::TypeExpr;
pub use type_registry::TypeRegistry;

/// Scalar kinds supported by the storage layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// 64-bit signed integer
    Integer,
    /// UTF-8 text
    Text,
    /// 64-bit floating point number
    Real,
    /// Boolean, stored as integer 0/1
    Boolean,
}

impl ScalarKind {
    /// Maps a scalar keyword (`int`, `str`, `float`, `bool` and aliases) to its kind.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "int" | "integer" | "i64" | "i32" | "u32" => Some(ScalarKind::Integer),
            "str" | "string" | "text" => Some(ScalarKind::Text),
            "float" | "real" | "f64" => Some(ScalarKind::Real),
            "bool" | "boolean" => Some(ScalarKind::Boolean),
            _ => None,
        }
    }

    /// Canonical keyword for this kind.
    pub fn keyword(&self) -> &'static str {
        match self {
            ScalarKind::Integer => "int",
            ScalarKind::Text => "str",
            ScalarKind::Real => "float",
            ScalarKind::Boolean => "bool",
        }
    }

    /// Storage column type.
    pub fn storage_type(&self) -> &'static str {
        match self {
            ScalarKind::Integer | ScalarKind::Boolean => "INTEGER",
            ScalarKind::Text => "TEXT",
            ScalarKind::Real => "REAL",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Named field of a record descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: TypeDescriptor,
}

/// Resolved shape of a type.
///
/// Built once per root type by [`TypeRegistry::resolve`] and shared
/// immutably afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    Scalar(ScalarKind),
    /// Ordered sequence of one element type
    List(Box<TypeDescriptor>),
    /// Text-keyed collection of one value type
    Map(Box<TypeDescriptor>),
    /// Named record with fields in declaration order
    Record {
        name: String,
        fields: Vec<FieldDescriptor>,
    },
}

impl TypeDescriptor {
    pub fn is_scalar(&self) -> bool {
        matches!(self, TypeDescriptor::Scalar(_))
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, TypeDescriptor::List(_) | TypeDescriptor::Map(_))
    }

    /// Returns the record fields, or `None` for non-record descriptors.
    pub fn fields(&self) -> Option<&[FieldDescriptor]> {
        match self {
            TypeDescriptor::Record { fields, .. } => Some(fields),
            _ => None,
        }
    }

    /// Short human-readable description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            TypeDescriptor::Scalar(kind) => kind.keyword().to_string(),
            TypeDescriptor::List(element) => format!("list<{}>", element.describe()),
            TypeDescriptor::Map(value) => format!("map<str, {}>", value.describe()),
            TypeDescriptor::Record { name, .. } => name.clone(),
        }
    }
}
