//! SQLite storage handle, executor resolution and unit-of-work entry points.
//!
//! # Responsibility
//! - Own the default connection used by non-transactional repository calls.
//! - Resolve the active executor for a call context.
//! - Define `DbError`, the store-level side of the repository error taxonomy.
//!
//! # Invariants
//! - The default connection is only reachable through `Database::executor`
//!   or `Database::with_connection`.
//! - A transaction handle never outlives the unit of work that opened it.

use std::sync::{Mutex, MutexGuard, PoisonError};

use log::warn;
use rusqlite::Connection;
use thiserror::Error;

use crate::query::BindingError;
use crate::record::CodecError;

mod executor;
pub mod manager;
mod open;

pub use executor::Executor;
pub use manager::Manager;
pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Store fault raised below the repository contract.
///
/// Everything except "zero rows" surfaces to domain code as one of these,
/// wrapped in `RepoError::Db`.
#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("invalid SQL identifier `{0}`")]
    InvalidIdentifier(String),
    #[error("column `{column}` is declared more than once on record `{record}`")]
    DuplicateColumn {
        record: &'static str,
        column: &'static str,
    },
    #[error("record `{0}` declares no identity column")]
    MissingIdentity(&'static str),
    #[error("default connection requested while a unit of work holds it on this thread")]
    ConnectionRequestedInsideTransaction,
    #[error("a unit of work is already active for this call chain")]
    NestedTransaction,
}

/// Database handle wrapping the default connection.
///
/// Independent callers on different threads serialize on the inner mutex.
/// Transactional callers never touch the mutex after the unit of work has
/// opened its transaction; they execute on the handle carried by their context.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Wraps an already configured connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Runs `f` against the default connection.
    ///
    /// Intended for bootstrap work (schema setup in demos and tests) that sits
    /// outside the repository contract.
    pub fn with_connection<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self.default_executor()?;
        Ok(f(&conn)?)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic inside a unit of work poisons the mutex after the transaction
        // has already rolled back on drop, so the connection itself is sound.
        self.conn.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            warn!("event=db_lock module=db status=recovered reason=poisoned");
            poisoned.into_inner()
        })
    }

    pub(crate) fn key(&self) -> usize {
        self as *const Database as usize
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}
