//! Unit-of-work manager.
//!
//! # Responsibility
//! - Open a transaction, expose it to a caller-supplied body through a
//!   derived context, then commit or roll back based on the body outcome.
//!
//! # Invariants
//! - Body `Ok` commits; body `Err` rolls back and the same error is returned.
//! - A body that panics rolls back when the transaction is dropped.
//! - Units of work do not nest; the inner attempt is rejected instead of
//!   silently joining or deadlocking.

use std::time::Instant;

use log::{debug, info, warn};
use rusqlite::{Transaction, TransactionBehavior};
use uuid::Uuid;

use super::executor::UnitOfWorkGuard;
use super::{Database, DbError};
use crate::context::Context;

/// Runs bodies inside a single database transaction.
#[derive(Debug, Clone, Copy)]
pub struct Manager<'db> {
    db: &'db Database,
}

impl<'db> Manager<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &'db Database {
        self.db
    }

    /// Runs `body` inside a transaction.
    ///
    /// Every repository call made through the context handed to `body`
    /// executes on the same transaction.
    ///
    /// # Errors
    /// - `DbError::NestedTransaction` when `ctx` already carries a transaction
    ///   or this thread already runs a unit of work on the same database.
    /// - Store errors from begin or commit, converted into `E`.
    /// - Whatever `body` returns, unchanged.
    pub fn run_in_transaction<T, E, F>(&self, ctx: &Context<'_>, body: F) -> Result<T, E>
    where
        F: FnOnce(&Context<'_>) -> Result<T, E>,
        E: From<DbError>,
    {
        if ctx.is_transactional() || UnitOfWorkGuard::is_active(self.db) {
            warn!("event=uow_begin module=db status=rejected reason=nested");
            return Err(DbError::NestedTransaction.into());
        }

        let uow_id = Uuid::new_v4();
        let started_at = Instant::now();
        debug!("event=uow_begin module=db status=start uow_id={uow_id}");

        let conn = self.db.lock();
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)
            .map_err(DbError::from)?;
        let guard = UnitOfWorkGuard::enter(self.db);

        let tx_ctx = ctx.with_transaction(&tx);
        let outcome = body(&tx_ctx);
        drop(tx_ctx);

        let result = match outcome {
            Ok(value) => match tx.commit() {
                Ok(()) => {
                    info!(
                        "event=uow_commit module=db status=ok uow_id={uow_id} duration_ms={}",
                        started_at.elapsed().as_millis()
                    );
                    Ok(value)
                }
                Err(err) => {
                    warn!(
                        "event=uow_commit module=db status=error uow_id={uow_id} duration_ms={} error={err}",
                        started_at.elapsed().as_millis()
                    );
                    Err(DbError::from(err).into())
                }
            },
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(
                        "event=uow_rollback module=db status=error uow_id={uow_id} error={rollback_err}"
                    );
                } else {
                    info!(
                        "event=uow_rollback module=db status=ok uow_id={uow_id} duration_ms={}",
                        started_at.elapsed().as_millis()
                    );
                }
                Err(err)
            }
        };

        drop(guard);
        result
    }
}
