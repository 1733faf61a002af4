//! Record metadata: column declarations, extraction and SQL fragments.
//!
//! # Responsibility
//! - Define the `Record` contract a persisted type implements.
//! - Provide the per-field storage annotations (`Column`) the rest of the
//!   data-access layer reads instead of inspecting types at runtime.
//!
//! # Invariants
//! - A column named `id` is the record identity.
//! - A column named `""` or `-` is not persisted.
//! - `COLUMNS` order is the order of every generated column list.
//!
//! # See also
//! - `descriptor` for extraction and caching.
//! - `fragments` for the generated SQL lists.

use std::fmt;

use rusqlite::types::Value;
use rusqlite::Row;

pub mod codec;
pub mod descriptor;
pub mod fragments;

pub use codec::{to_value, CodecError, Json, JsonMap, StoredText};
pub use descriptor::{validate_identifier, FieldMeta, RecordDescriptor};
pub use fragments::{quote_identifier, SqlFragments};

/// Column name reserved for the record identity.
pub const IDENTITY_COLUMN: &str = "id";
/// Column annotation marking a field as not persisted.
pub const SKIP_MARKER: &str = "-";

/// Storage annotation of one record field.
pub struct Column<R> {
    pub field: &'static str,
    pub name: &'static str,
    read: fn(&R) -> Result<Value, CodecError>,
}

impl<R> Column<R> {
    pub const fn new(
        field: &'static str,
        name: &'static str,
        read: fn(&R) -> Result<Value, CodecError>,
    ) -> Self {
        Self { field, name, read }
    }

    /// Declares a field that exists on the record but has no column.
    pub const fn skipped(field: &'static str) -> Self {
        Self {
            field,
            name: SKIP_MARKER,
            read: read_nothing::<R>,
        }
    }

    /// Encodes this field of `record` into a bind value.
    pub fn value(&self, record: &R) -> Result<Value, CodecError> {
        (self.read)(record)
    }
}

impl<R> fmt::Debug for Column<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("field", &self.field)
            .field("name", &self.name)
            .finish()
    }
}

fn read_nothing<R>(_: &R) -> Result<Value, CodecError> {
    Ok(Value::Null)
}

/// A type persisted in one table through the generic repository.
pub trait Record: Sized + 'static {
    /// Default table name; repositories may be bound to another table.
    const TABLE: &'static str;
    /// Field annotations in declaration order.
    const COLUMNS: &'static [Column<Self>];
    /// Column stamped by soft delete.
    const SOFT_DELETE_COLUMN: &'static str = "deletedAt";

    type Id: Into<Value> + Clone + fmt::Debug;

    /// Decodes a row produced by the record's select list.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}
