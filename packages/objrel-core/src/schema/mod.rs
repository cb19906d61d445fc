//! Schema compilation: table and column definitions derived from a
//! resolved type descriptor.

mod column;
mod compiler;
pub mod naming;
mod table;

pub use column::{ColumnDef, ColumnRole};
pub use compiler::SchemaCompiler;
pub use table::{SchemaPlan, TableDef};
