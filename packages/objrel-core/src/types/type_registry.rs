use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::declaration::RecordDecl;
use super::error::TypeError;
use super::type_expr::TypeExpr;
use super::{FieldDescriptor, ScalarKind, TypeDescriptor};
use crate::persist::Persist;

/// Registry for record declarations and resolved descriptors.
///
/// Resolution validates the whole tree before returning, so a descriptor
/// handed out by the registry never contains an unsupported shape.
/// Resolved descriptors are cached per type expression for the lifetime of
/// the registry.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    records: RwLock<HashMap<String, RecordDecl>>,
    resolved: RwLock<HashMap<String, Arc<TypeDescriptor>>>,
}

impl TypeRegistry {
    /// Creates a new empty type registry.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            resolved: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a record declaration.
    ///
    /// Registering an identical declaration twice is a no-op; registering a
    /// different declaration under a taken name, or a name differing from a
    /// taken one only in case, fails with `TypeError::AlreadyRegistered`.
    pub fn register(&self, decl: RecordDecl) -> Result<(), TypeError> {
        let mut records = self.records.write().map_err(|_| TypeError::LockPoisoned)?;

        if let Some(existing) = records.get(&decl.name) {
            if *existing == decl {
                return Ok(());
            }
            return Err(TypeError::AlreadyRegistered {
                name: decl.name.clone(),
            });
        }
        if let Some(taken) = records
            .keys()
            .find(|name| name.eq_ignore_ascii_case(&decl.name))
        {
            return Err(TypeError::AlreadyRegistered {
                name: taken.clone(),
            });
        }

        tracing::debug!("Registered record type '{}'", decl.name);
        records.insert(decl.name.clone(), decl);
        Ok(())
    }

    /// Retrieves a record declaration by name.
    pub fn get(&self, name: &str) -> Option<RecordDecl> {
        let records = self.records.read().ok()?;
        records.get(name).cloned()
    }

    /// Checks if a record type is registered.
    pub fn contains(&self, name: &str) -> bool {
        match self.records.read() {
            Ok(records) => records.contains_key(name),
            Err(_) => false,
        }
    }

    /// Returns all registered record names, sorted.
    pub fn type_names(&self) -> Vec<String> {
        let records = match self.records.read() {
            Ok(guard) => guard,
            Err(_) => return Vec::new(),
        };
        let mut names: Vec<String> = records.keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolves a type expression into a descriptor.
    ///
    /// # Errors
    /// `TypeError::Unsupported` if any node of the tree is a union, an
    /// unknown name, a `list`/`map` with the wrong parameter count, a map
    /// with non-text keys, or a record that contains itself.
    pub fn resolve(&self, expr: &TypeExpr) -> Result<Arc<TypeDescriptor>, TypeError> {
        let cache_key = expr.to_string();
        {
            let resolved = self.resolved.read().map_err(|_| TypeError::LockPoisoned)?;
            if let Some(descriptor) = resolved.get(&cache_key) {
                return Ok(Arc::clone(descriptor));
            }
        }

        let descriptor = {
            let records = self.records.read().map_err(|_| TypeError::LockPoisoned)?;
            let mut stack = Vec::new();
            Arc::new(resolve_expr(&records, expr, &cache_key, &mut stack)?)
        };

        let mut resolved = self.resolved.write().map_err(|_| TypeError::LockPoisoned)?;
        let descriptor = resolved.entry(cache_key).or_insert(descriptor);
        Ok(Arc::clone(descriptor))
    }

    /// Resolves a registered record type by name.
    pub fn resolve_named(&self, name: &str) -> Result<Arc<TypeDescriptor>, TypeError> {
        self.resolve(&TypeExpr::named(name))
    }

    /// Registers the declarations `T` depends on and resolves its descriptor.
    pub fn resolve_persist<T: Persist>(&self) -> Result<Arc<TypeDescriptor>, TypeError> {
        T::register(self)?;
        self.resolve(&T::type_expr())
    }
}

fn resolve_expr(
    records: &HashMap<String, RecordDecl>,
    expr: &TypeExpr,
    path: &str,
    stack: &mut Vec<String>,
) -> Result<TypeDescriptor, TypeError> {
    match expr {
        TypeExpr::Union(_) => Err(TypeError::unsupported(
            path,
            format!("union type '{}' has no relational representation", expr),
        )),
        TypeExpr::Named(name) => {
            if let Some(kind) = ScalarKind::from_keyword(name) {
                return Ok(TypeDescriptor::Scalar(kind));
            }
            if name == "list" || name == "map" {
                return Err(TypeError::unsupported(
                    path,
                    format!("'{}' used without type parameters", name),
                ));
            }

            let decl = records.get(name).ok_or_else(|| {
                TypeError::unsupported(path, format!("unresolved type '{}'", name))
            })?;
            if stack.iter().any(|open| open == name) {
                return Err(TypeError::unsupported(
                    path,
                    format!("record '{}' contains itself", name),
                ));
            }

            stack.push(name.clone());
            let mut fields = Vec::with_capacity(decl.fields.len());
            for (field_name, field_expr) in &decl.fields {
                let field_path = format!("{}.{}", path, field_name);
                let ty = resolve_expr(records, field_expr, &field_path, stack)?;
                fields.push(FieldDescriptor {
                    name: field_name.clone(),
                    ty,
                });
            }
            stack.pop();

            Ok(TypeDescriptor::Record {
                name: name.clone(),
                fields,
            })
        }
        TypeExpr::Generic { name, args } => match name.as_str() {
            "list" => {
                if args.len() != 1 {
                    return Err(TypeError::unsupported(
                        path,
                        format!("list takes exactly one type parameter, got {}", args.len()),
                    ));
                }
                let element = resolve_expr(records, &args[0], &format!("{}[]", path), stack)?;
                Ok(TypeDescriptor::List(Box::new(element)))
            }
            "map" => {
                if args.len() != 2 {
                    return Err(TypeError::unsupported(
                        path,
                        format!("map takes a key and a value parameter, got {}", args.len()),
                    ));
                }
                let key = resolve_expr(records, &args[0], &format!("{}{{key}}", path), stack)?;
                if key != TypeDescriptor::Scalar(ScalarKind::Text) {
                    return Err(TypeError::unsupported(
                        path,
                        format!("map keys must be str, got {}", key.describe()),
                    ));
                }
                let value = resolve_expr(records, &args[1], &format!("{}{{}}", path), stack)?;
                Ok(TypeDescriptor::Map(Box::new(value)))
            }
            other => Err(TypeError::unsupported(
                path,
                format!("unknown generic type '{}'", other),
            )),
        },
    }
}
