//! Object-to-relational marshalling engine.
//!
//! Resolves nested record types into type descriptors, compiles each root
//! type into a set of parent/child tables, and writes and reads value trees
//! through those tables. A JSON object store with attribute-path indexes is
//! provided alongside the relational layout.

pub mod config;
pub mod database;
pub mod error;
pub mod json;
pub mod marshal;
pub mod object_store;
pub mod persist;
pub mod schema;
pub mod storage;
pub mod types;
pub mod value;

pub use config::EngineConfig;
pub use database::{Collection, Database};
pub use error::{MarshalError, Result};
pub use marshal::RowId;
pub use persist::Persist;
pub use value::Value;
