//! Static registration of Rust types with the type system.
//!
//! [`Persist`] is the bridge between typed Rust values and the dynamic
//! [`Value`] tree. Scalars, `Vec`, `BTreeMap` and `HashMap` are covered here;
//! record structs use [`persist_record!`](crate::persist_record).

use std::collections::{BTreeMap, HashMap};

use crate::error::{MarshalError, Result};
use crate::types::{TypeError, TypeExpr, TypeRegistry};
use crate::value::Value;

/// A type that can be described, written and read by the marshalling engine.
pub trait Persist: Sized {
    /// Type expression naming this type's shape.
    fn type_expr() -> TypeExpr;

    /// Registers the record declarations this type depends on.
    fn register(_registry: &TypeRegistry) -> std::result::Result<(), TypeError> {
        Ok(())
    }

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch(expected: &str, found: &Value) -> MarshalError {
    MarshalError::TypeMismatch {
        path: String::new(),
        expected: expected.to_string(),
        found: found.kind_name().to_string(),
    }
}

impl Persist for i64 {
    fn type_expr() -> TypeExpr {
        TypeExpr::named("int")
    }

    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Integer(i) => Ok(i),
            other => Err(mismatch("int", &other)),
        }
    }
}

macro_rules! persist_narrow_int {
    ($($ty:ty => $keyword:literal),* $(,)?) => {
        $(
            impl Persist for $ty {
                fn type_expr() -> TypeExpr {
                    TypeExpr::named($keyword)
                }

                fn to_value(&self) -> Value {
                    Value::Integer(i64::from(*self))
                }

                fn from_value(value: Value) -> Result<Self> {
                    match value {
                        Value::Integer(i) => <$ty>::try_from(i).map_err(|_| {
                            MarshalError::TypeMismatch {
                                path: String::new(),
                                expected: $keyword.to_string(),
                                found: format!("out-of-range int {}", i),
                            }
                        }),
                        other => Err(mismatch($keyword, &other)),
                    }
                }
            }
        )*
    };
}

persist_narrow_int!(i32 => "i32", u32 => "u32");

impl Persist for String {
    fn type_expr() -> TypeExpr {
        TypeExpr::named("str")
    }

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(mismatch("str", &other)),
        }
    }
}

impl Persist for f64 {
    fn type_expr() -> TypeExpr {
        TypeExpr::named("float")
    }

    fn to_value(&self) -> Value {
        Value::Real(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Real(f) => Ok(f),
            other => Err(mismatch("float", &other)),
        }
    }
}

impl Persist for bool {
    fn type_expr() -> TypeExpr {
        TypeExpr::named("bool")
    }

    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Boolean(b) => Ok(b),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl<T: Persist> Persist for Vec<T> {
    fn type_expr() -> TypeExpr {
        TypeExpr::list(T::type_expr())
    }

    fn register(registry: &TypeRegistry) -> std::result::Result<(), TypeError> {
        T::register(registry)
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(Persist::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch("list", &other)),
        }
    }
}

impl<T: Persist> Persist for BTreeMap<String, T> {
    fn type_expr() -> TypeExpr {
        TypeExpr::map(T::type_expr())
    }

    fn register(registry: &TypeRegistry) -> std::result::Result<(), TypeError> {
        T::register(registry)
    }

    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.clone(), v.to_value()))
                .collect(),
        )
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| -> Result<(String, T)> { Ok((k, T::from_value(v)?)) })
                .collect(),
            other => Err(mismatch("map", &other)),
        }
    }
}

impl<T: Persist> Persist for HashMap<String, T> {
    fn type_expr() -> TypeExpr {
        TypeExpr::map(T::type_expr())
    }

    fn register(registry: &TypeRegistry) -> std::result::Result<(), TypeError> {
        T::register(registry)
    }

    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.clone(), v.to_value()))
                .collect(),
        )
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| -> Result<(String, T)> { Ok((k, T::from_value(v)?)) })
                .collect(),
            other => Err(mismatch("map", &other)),
        }
    }
}

/// Implements [`Persist`] for a plain struct whose fields all implement it.
///
/// ```
/// use objrel_core::persist_record;
///
/// #[derive(Debug, PartialEq)]
/// struct Point {
///     x: i64,
///     y: i64,
/// }
///
/// persist_record!(Point { x: i64, y: i64 });
/// ```
#[macro_export]
macro_rules! persist_record {
    ($ty:ident { $($field:ident : $fty:ty),* $(,)? }) => {
        impl $crate::Persist for $ty {
            fn type_expr() -> $crate::types::TypeExpr {
                $crate::types::TypeExpr::named(stringify!($ty))
            }

            fn register(
                registry: &$crate::types::TypeRegistry,
            ) -> ::std::result::Result<(), $crate::types::TypeError> {
                if registry.contains(stringify!($ty)) {
                    return Ok(());
                }
                registry.register($crate::types::RecordDecl::new(
                    stringify!($ty),
                    vec![$(
                        (
                            stringify!($field).to_string(),
                            <$fty as $crate::Persist>::type_expr(),
                        ),
                    )*],
                )?)?;
                $( <$fty as $crate::Persist>::register(registry)?; )*
                Ok(())
            }

            fn to_value(&self) -> $crate::Value {
                $crate::Value::Record(vec![$(
                    (
                        stringify!($field).to_string(),
                        $crate::Persist::to_value(&self.$field),
                    ),
                )*])
            }

            #[allow(unused_mut)]
            fn from_value(value: $crate::Value) -> $crate::error::Result<Self> {
                let mut fields = $crate::value::RecordFields::from_value(value, stringify!($ty))?;
                Ok(Self {
                    $( $field: fields.take(stringify!($field))?, )*
                })
            }
        }
    };
}
