//! Executor resolution: in-flight transaction first, default connection otherwise.

use std::cell::RefCell;
use std::ops::Deref;
use std::sync::MutexGuard;

use rusqlite::Connection;

use super::{Database, DbError, DbResult};
use crate::context::Context;

thread_local! {
    // Databases whose default connection is held by a unit of work on this thread.
    static ACTIVE_UNITS: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Connection a repository statement runs on.
///
/// Both variants deref to `rusqlite::Connection`, so statement code is
/// written once for the transactional and the non-transactional path.
pub enum Executor<'c> {
    /// Borrowed handle of the transaction carried by the call context.
    Transaction(&'c Connection),
    /// Exclusive access to the default connection for one operation.
    Default(MutexGuard<'c, Connection>),
}

impl Executor<'_> {
    pub fn is_transactional(&self) -> bool {
        matches!(self, Self::Transaction(_))
    }
}

impl Deref for Executor<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        match self {
            Self::Transaction(conn) => *conn,
            Self::Default(guard) => &**guard,
        }
    }
}

impl Database {
    /// Resolves the executor for `ctx`.
    ///
    /// # Errors
    /// - `ConnectionRequestedInsideTransaction` when `ctx` carries no
    ///   transaction but a unit of work on this thread already holds the
    ///   default connection (the call would otherwise deadlock).
    ///
    /// The check is per thread. A thread spawned from inside a unit of work
    /// that resolves the default connection blocks until the unit of work
    /// ends, so joining it from the body never returns.
    pub fn executor<'c>(&'c self, ctx: &'c Context<'_>) -> DbResult<Executor<'c>> {
        match ctx.transaction() {
            Some(tx) => Ok(Executor::Transaction(tx)),
            None => self.default_executor(),
        }
    }

    pub(crate) fn default_executor(&self) -> DbResult<Executor<'_>> {
        if UnitOfWorkGuard::is_active(self) {
            return Err(DbError::ConnectionRequestedInsideTransaction);
        }
        Ok(Executor::Default(self.lock()))
    }
}

/// Marks a database as held by a unit of work on the current thread.
pub(crate) struct UnitOfWorkGuard {
    key: usize,
}

impl UnitOfWorkGuard {
    pub(crate) fn enter(db: &Database) -> Self {
        let key = db.key();
        ACTIVE_UNITS.with(|units| units.borrow_mut().push(key));
        Self { key }
    }

    pub(crate) fn is_active(db: &Database) -> bool {
        let key = db.key();
        ACTIVE_UNITS.with(|units| units.borrow().contains(&key))
    }
}

impl Drop for UnitOfWorkGuard {
    fn drop(&mut self) {
        ACTIVE_UNITS.with(|units| {
            let mut units = units.borrow_mut();
            if let Some(position) = units.iter().rposition(|key| *key == self.key) {
                units.remove(position);
            }
        });
    }
}
