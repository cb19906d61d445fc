//! Database facade tying the type registry, schema compiler, writer and
//! reader to one storage handle.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::{MarshalError, Result};
use crate::marshal::{KeyChain, Marshaller, RowId, Unmarshaller};
use crate::object_store::ObjectStore;
use crate::persist::Persist;
use crate::schema::{naming, SchemaCompiler, SchemaPlan};
use crate::storage::{in_savepoint, quote_ident, SqlValue, SqliteStorage, Storage};
use crate::types::{TypeDescriptor, TypeRegistry};
use crate::value::Value;

const COMPILE_SAVEPOINT: &str = "objrel_compile";
const INSERT_SAVEPOINT: &str = "objrel_insert";

/// Database holding a storage handle and the type registry.
///
/// A database serves a single writer: list ordinals are computed from the
/// current maximum without isolation beyond the enclosing savepoint.
pub struct Database<S: Storage = SqliteStorage> {
    storage: S,
    /// Type registry for record declarations
    type_registry: Arc<TypeRegistry>,
    config: EngineConfig,
}

impl Database<SqliteStorage> {
    /// Opens the SQLite database described by `config`.
    pub fn open(config: EngineConfig) -> Result<Self> {
        let storage = SqliteStorage::open(&config)?;
        tracing::info!("Opened database at {}", config.database_path.display());
        Ok(Self::with_storage(storage, config))
    }

    /// Opens a fresh in-memory database.
    pub fn in_memory() -> Result<Self> {
        Self::open(EngineConfig::in_memory())
    }
}

impl<S: Storage> Database<S> {
    /// Wraps an existing storage handle.
    pub fn with_storage(storage: S, config: EngineConfig) -> Self {
        Self {
            storage,
            type_registry: Arc::new(TypeRegistry::new()),
            config,
        }
    }

    /// Replaces the type registry, e.g. with one shared between databases.
    pub fn with_type_registry(mut self, type_registry: Arc<TypeRegistry>) -> Self {
        self.type_registry = type_registry;
        self
    }

    /// Returns a reference to the type registry.
    pub fn type_registry(&self) -> &Arc<TypeRegistry> {
        &self.type_registry
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Creates the tables storing `descriptor` under root table `table`.
    ///
    /// # Arguments
    /// * `descriptor` - Resolved root type
    /// * `table` - Root table name
    ///
    /// # Returns
    /// `Result<SchemaPlan>` describing every table of the root type.
    pub fn compile(&self, descriptor: &TypeDescriptor, table: &str) -> Result<SchemaPlan> {
        self.atomically(COMPILE_SAVEPOINT, || {
            SchemaCompiler::compile(&self.storage, descriptor, table)
        })
    }

    /// Inserts `value` as a new row group of root table `table`.
    ///
    /// Either every row of the group is written or none is. Returns the root
    /// row id for Scalar and Record roots.
    pub fn insert_value(
        &self,
        descriptor: &TypeDescriptor,
        table: &str,
        value: &Value,
    ) -> Result<Option<RowId>> {
        self.atomically(INSERT_SAVEPOINT, || {
            Marshaller::new(&self.storage).insert(descriptor, table, value, &KeyChain::root())
        })
    }

    /// Reads the root value in row `id` of `table`.
    pub fn get_value(&self, descriptor: &TypeDescriptor, table: &str, id: RowId) -> Result<Value> {
        Unmarshaller::new(&self.storage).get_by_id(descriptor, table, id)
    }

    /// Reads every root value of `table`.
    pub fn get_all_values(&self, descriptor: &TypeDescriptor, table: &str) -> Result<Vec<Value>> {
        Unmarshaller::new(&self.storage).get_all(descriptor, table)
    }

    /// Deletes root row `id` of `table` and, through cascading foreign keys,
    /// its whole row group. Returns `false` if no such row exists.
    pub fn delete_row(&self, table: &str, id: RowId) -> Result<bool> {
        naming::validate_table_name(table)?;
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?",
            quote_ident(table),
            quote_ident(&naming::primary_key_column(table))
        );
        let deleted = self.storage.execute(&sql, &[SqlValue::Integer(id)])?;
        tracing::debug!("Deleted {} row(s) from '{}'", deleted, table);
        Ok(deleted > 0)
    }

    /// Registers `T`, compiles its schema under `table` and returns a typed
    /// handle.
    pub fn collection<T: Persist>(&self, table: &str) -> Result<Collection<'_, T, S>> {
        let descriptor = self.type_registry.resolve_persist::<T>()?;
        if descriptor.is_collection() {
            return Err(MarshalError::Unrepresentable {
                path: table.to_string(),
                reason: format!(
                    "{} root has no row id; use Database::insert_value",
                    descriptor.describe()
                ),
            });
        }
        let plan = self.compile(&descriptor, table)?;
        Ok(Collection {
            db: self,
            descriptor,
            plan,
            _marker: PhantomData,
        })
    }

    /// Opens the JSON object store for `T` in the configured object table.
    pub fn object_store<T: Persist>(&self) -> Result<ObjectStore<'_, S>> {
        let table = self.config.object_table.clone();
        self.object_store_in::<T>(&table)
    }

    /// Opens the JSON object store for `T` in `table`.
    pub fn object_store_in<T: Persist>(&self, table: &str) -> Result<ObjectStore<'_, S>> {
        let descriptor = self.type_registry.resolve_persist::<T>()?;
        ObjectStore::open(&self.storage, descriptor, table)
    }

    fn atomically<T>(&self, savepoint: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        if self.config.atomic_writes {
            in_savepoint(&self.storage, savepoint, f)
        } else {
            f()
        }
    }
}

/// Typed handle on the tables of one root type.
pub struct Collection<'db, T, S: Storage = SqliteStorage> {
    db: &'db Database<S>,
    descriptor: Arc<TypeDescriptor>,
    plan: SchemaPlan,
    _marker: PhantomData<fn() -> T>,
}

impl<'db, T: Persist, S: Storage> Collection<'db, T, S> {
    pub fn table(&self) -> &str {
        &self.plan.root
    }

    /// Compiled schema of the root type.
    pub fn plan(&self) -> &SchemaPlan {
        &self.plan
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn insert(&self, item: &T) -> Result<RowId> {
        let id = self
            .db
            .insert_value(&self.descriptor, &self.plan.root, &item.to_value())?;
        id.ok_or_else(|| MarshalError::Unrepresentable {
            path: self.plan.root.clone(),
            reason: "insert produced no root row".to_string(),
        })
    }

    pub fn get(&self, id: RowId) -> Result<T> {
        T::from_value(self.db.get_value(&self.descriptor, &self.plan.root, id)?)
    }

    /// Every stored item in row id order.
    pub fn get_all(&self) -> Result<Vec<T>> {
        self.db
            .get_all_values(&self.descriptor, &self.plan.root)?
            .into_iter()
            .map(T::from_value)
            .collect()
    }

    /// Root row ids in ascending order.
    pub fn ids(&self) -> Result<Vec<RowId>> {
        Unmarshaller::new(self.db.storage()).row_ids(&self.plan.root)
    }

    pub fn delete(&self, id: RowId) -> Result<bool> {
        self.db.delete_row(&self.plan.root, id)
    }
}
