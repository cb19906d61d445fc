//! Marshalling between value trees and rows.
//!
//! [`Marshaller`] and [`Unmarshaller`] walk the same
//! [`TypeDescriptor`](crate::types::TypeDescriptor) tree in the same order,
//! so every row the writer produces is found again by the reader through the
//! same key chain.

mod keys;
mod reader;
mod writer;

pub use keys::KeyChain;
pub use reader::Unmarshaller;
pub use writer::Marshaller;

/// Primary key of a row.
pub type RowId = i64;

fn field_path(path: &str, field: &str) -> String {
    format!("{}.{}", path, field)
}
