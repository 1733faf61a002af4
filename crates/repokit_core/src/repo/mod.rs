//! Generic repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Define the CRUD contract domain services program against.
//! - Keep SQL construction inside the persistence boundary.
//!
//! # Invariants
//! - Every operation takes the call context first and runs on the executor
//!   it resolves to (transaction if present, default connection otherwise).
//! - Zero rows on a single-row read is `RepoError::NotFound`; every other
//!   fault is `RepoError::Db`.
//!
//! # See also
//! - `record` for the metadata the SQL is generated from.
//! - `db::Manager` for units of work.

use thiserror::Error;

use crate::context::Context;
use crate::db::DbError;
use crate::query::{Args, BindingError};
use crate::record::{CodecError, Record};

pub mod sqlite_repo;

pub use sqlite_repo::SqliteRepository;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("no rows found in `{table}`")]
    NotFound { table: String },
    #[error(transparent)]
    Db(#[from] DbError),
}

impl RepoError {
    pub fn not_found(table: impl Into<String>) -> Self {
        Self::NotFound {
            table: table.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<BindingError> for RepoError {
    fn from(value: BindingError) -> Self {
        Self::Db(DbError::Binding(value))
    }
}

impl From<CodecError> for RepoError {
    fn from(value: CodecError) -> Self {
        Self::Db(DbError::Codec(value))
    }
}

/// CRUD contract implemented once for every `Record` type.
///
/// Filters and queries use `:name` placeholders bound from `args`; list
/// arguments expand for `IN (...)`.
pub trait GenericRepository<R: Record> {
    /// First row of `SELECT <columns> FROM <table> WHERE <filter>`.
    fn single(&self, ctx: &Context<'_>, filter: &str, args: &Args) -> RepoResult<R>;

    /// All rows of `SELECT <columns> FROM <table> WHERE <filter>`.
    fn filter(&self, ctx: &Context<'_>, filter: &str, args: &Args) -> RepoResult<Vec<R>>;

    /// All rows of a caller-written statement selecting the record columns.
    fn select_with_query(&self, ctx: &Context<'_>, query: &str, args: &Args)
        -> RepoResult<Vec<R>>;

    fn find_by_id(&self, ctx: &Context<'_>, id: R::Id) -> RepoResult<R>;

    /// One page ordered by identity, newest first. `page` starts at 1.
    fn find_all(&self, ctx: &Context<'_>, page: i64, limit: i64) -> RepoResult<Vec<R>>;

    /// Inserts `record` and replaces it with the stored row.
    fn insert(&self, ctx: &Context<'_>, record: &mut R) -> RepoResult<()>;

    /// Overwrites every persisted field of the row identified by `record`
    /// and replaces `record` with the stored row.
    fn update(&self, ctx: &Context<'_>, record: &mut R) -> RepoResult<()>;

    /// Stamps the soft-delete column with the current UTC time.
    fn delete(&self, ctx: &Context<'_>, id: R::Id) -> RepoResult<()>;

    fn delete_hard(&self, ctx: &Context<'_>, id: R::Id) -> RepoResult<()>;
}
