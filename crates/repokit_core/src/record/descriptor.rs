//! Per-record metadata extraction and caching.
//!
//! # Responsibility
//! - Turn a record's declared columns into `FieldMeta` entries.
//! - Derive `SqlFragments` once per record type and share them.
//!
//! # Invariants
//! - Extraction is pure: the same record type always yields the same result.
//! - Skipped fields (empty or `-` column) never appear in any fragment.
//! - A record declaring the same column twice is rejected.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use regex::Regex;

use super::fragments::SqlFragments;
use super::{Column, Record, IDENTITY_COLUMN, SKIP_MARKER};
use crate::db::{DbError, DbResult};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

static DESCRIPTORS: Lazy<RwLock<HashMap<TypeId, Arc<RecordDescriptor>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Storage mapping of one declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMeta {
    pub field: &'static str,
    /// Column name, or `None` when the field is not persisted.
    pub column: Option<&'static str>,
    pub identity: bool,
}

/// Extracted metadata for one record type.
#[derive(Debug, Clone)]
pub struct RecordDescriptor {
    record: &'static str,
    fields: Vec<FieldMeta>,
    fragments: SqlFragments,
}

impl RecordDescriptor {
    /// Extracts metadata for `R` without consulting the cache.
    pub fn build<R: Record>() -> DbResult<Self> {
        let record = std::any::type_name::<R>();
        let fields: Vec<FieldMeta> = R::COLUMNS.iter().map(field_meta).collect();

        let mut seen: Vec<&'static str> = Vec::with_capacity(fields.len());
        for column in fields.iter().filter_map(|field| field.column) {
            validate_identifier(column)?;
            if seen.contains(&column) {
                return Err(DbError::DuplicateColumn { record, column });
            }
            seen.push(column);
        }
        validate_identifier(R::SOFT_DELETE_COLUMN)?;

        let fragments = SqlFragments::from_fields(&fields);
        Ok(Self {
            record,
            fields,
            fragments,
        })
    }

    /// Returns the shared descriptor for `R`, extracting it on first use.
    pub fn of<R: Record>() -> DbResult<Arc<Self>> {
        let key = TypeId::of::<R>();
        if let Some(found) = read_cache(|cache| cache.get(&key).cloned()) {
            return Ok(found);
        }

        let built = Arc::new(Self::build::<R>()?);
        let mut cache = DESCRIPTORS
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(cache.entry(key).or_insert(built).clone())
    }

    pub fn record(&self) -> &'static str {
        self.record
    }

    pub fn fields(&self) -> &[FieldMeta] {
        &self.fields
    }

    pub fn fragments(&self) -> &SqlFragments {
        &self.fragments
    }

    /// Fields that map to a column.
    pub fn persisted(&self) -> impl Iterator<Item = &FieldMeta> {
        self.fields.iter().filter(|field| field.column.is_some())
    }

    /// Persisted fields other than the identity.
    pub fn writable(&self) -> impl Iterator<Item = &FieldMeta> {
        self.persisted().filter(|field| !field.identity)
    }

    pub fn identity(&self) -> Option<&FieldMeta> {
        self.fields.iter().find(|field| field.identity)
    }
}

/// Checks that `name` is a plain SQL identifier.
pub fn validate_identifier(name: &str) -> DbResult<()> {
    if IDENTIFIER_RE.is_match(name) {
        Ok(())
    } else {
        Err(DbError::InvalidIdentifier(name.to_string()))
    }
}

fn field_meta<R>(column: &Column<R>) -> FieldMeta {
    let mapped = match column.name {
        "" | SKIP_MARKER => None,
        name => Some(name),
    };
    FieldMeta {
        field: column.field,
        column: mapped,
        identity: mapped == Some(IDENTITY_COLUMN),
    }
}

fn read_cache<T>(f: impl FnOnce(&HashMap<TypeId, Arc<RecordDescriptor>>) -> T) -> T {
    let cache = DESCRIPTORS
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&cache)
}

#[cfg(test)]
mod tests {
    use super::{validate_identifier, RecordDescriptor};
    use crate::db::DbError;
    use crate::record::{codec::to_value, Column, Record};
    use rusqlite::Row;
    use std::sync::Arc;

    #[allow(dead_code)]
    struct Hero {
        id: i64,
        name: String,
        nickname: String,
        rank: i64,
    }

    impl Record for Hero {
        const TABLE: &'static str = "heroes";
        const COLUMNS: &'static [Column<Self>] = &[
            Column::new("id", "id", |r| to_value(&r.id)),
            Column::new("name", "name", |r| to_value(&r.name)),
            Column::new("nickname", "", |r| to_value(&r.nickname)),
            Column::skipped("rank"),
        ];
        type Id = i64;

        fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
            Ok(Self {
                id: row.get("id")?,
                name: row.get("name")?,
                nickname: String::new(),
                rank: 0,
            })
        }
    }

    struct Twice;

    impl Record for Twice {
        const TABLE: &'static str = "twice";
        const COLUMNS: &'static [Column<Self>] = &[
            Column::new("a", "label", |_| Ok(rusqlite::types::Value::Null)),
            Column::new("b", "label", |_| Ok(rusqlite::types::Value::Null)),
        ];
        type Id = i64;

        fn from_row(_row: &Row<'_>) -> rusqlite::Result<Self> {
            Ok(Self)
        }
    }

    struct Spaced;

    impl Record for Spaced {
        const TABLE: &'static str = "spaced";
        const COLUMNS: &'static [Column<Self>] =
            &[Column::new("a", "bad name", |_| Ok(rusqlite::types::Value::Null))];
        type Id = i64;

        fn from_row(_row: &Row<'_>) -> rusqlite::Result<Self> {
            Ok(Self)
        }
    }

    #[test]
    fn empty_and_marker_columns_are_not_persisted() {
        let descriptor = RecordDescriptor::build::<Hero>().expect("hero metadata");

        let persisted: Vec<_> = descriptor.persisted().map(|f| f.field).collect();
        assert_eq!(persisted, vec!["id", "name"]);
        assert_eq!(descriptor.identity().map(|f| f.field), Some("id"));
        assert_eq!(descriptor.writable().count(), 1);
        assert_eq!(descriptor.fields().len(), 4);
    }

    #[test]
    fn extraction_is_deterministic_and_cached() {
        let first = RecordDescriptor::build::<Hero>().unwrap();
        let second = RecordDescriptor::build::<Hero>().unwrap();
        assert_eq!(first.fields(), second.fields());
        assert_eq!(first.fragments(), second.fragments());

        let cached_a = RecordDescriptor::of::<Hero>().unwrap();
        let cached_b = RecordDescriptor::of::<Hero>().unwrap();
        assert!(Arc::ptr_eq(&cached_a, &cached_b));
    }

    #[test]
    fn duplicate_columns_are_rejected() {
        let err = RecordDescriptor::build::<Twice>().expect_err("duplicate column");
        assert!(matches!(err, DbError::DuplicateColumn { column: "label", .. }));
    }

    #[test]
    fn invalid_column_names_are_rejected() {
        let err = RecordDescriptor::build::<Spaced>().expect_err("invalid identifier");
        assert!(matches!(err, DbError::InvalidIdentifier(name) if name == "bad name"));
        assert!(validate_identifier("createdAt").is_ok());
        assert!(validate_identifier("1st").is_err());
        assert!(validate_identifier("name; DROP TABLE x").is_err());
    }
}
