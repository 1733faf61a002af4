//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Apply the connection pragmas taken from `DatabaseConfig`.
//!
//! # Invariants
//! - Returned handles have the configured busy timeout and foreign key mode.
//! - Schema creation is the caller's concern; nothing is migrated here.

use super::{Database, DbResult};
use crate::config::DatabaseConfig;
use log::{error, info};
use rusqlite::Connection;
use std::time::{Duration, Instant};

/// Opens the database described by `config`.
///
/// A config without `path` opens a private in-memory database.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(config: &DatabaseConfig) -> DbResult<Database> {
    let mode = if config.path.is_some() { "file" } else { "memory" };
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let opened = match &config.path {
        Some(path) => Connection::open(path),
        None => Connection::open_in_memory(),
    };
    let conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    if let Err(err) = configure_connection(&conn, config) {
        error!(
            "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_configure_failed error={}",
            started_at.elapsed().as_millis(),
            err
        );
        return Err(err.into());
    }

    info!(
        "event=db_open module=db status=ok mode={mode} duration_ms={}",
        started_at.elapsed().as_millis()
    );
    Ok(Database::from_connection(conn))
}

/// Opens an in-memory database with default connection settings.
pub fn open_db_in_memory() -> DbResult<Database> {
    open_db(&DatabaseConfig::default())
}

fn configure_connection(conn: &Connection, config: &DatabaseConfig) -> rusqlite::Result<()> {
    let foreign_keys = if config.foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {foreign_keys};"))?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    Ok(())
}
