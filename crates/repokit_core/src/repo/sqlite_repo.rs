//! SQLite implementation of `GenericRepository`.
//!
//! # Responsibility
//! - Turn cached record fragments into statements for one table.
//! - Bind record fields and caller arguments by name, never by splicing.
//!
//! # Invariants
//! - The executor is resolved once per operation and reused for every
//!   statement that operation issues.
//! - Statement text is built at construction from validated identifiers only.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use log::{debug, warn};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use super::{GenericRepository, RepoError, RepoResult};
use crate::context::Context;
use crate::db::{Database, DbError, DbResult};
use crate::query::{bind_named, page_offset, Args};
use crate::record::{
    quote_identifier, to_value, validate_identifier, Record, RecordDescriptor, IDENTITY_COLUMN,
};

/// Generic repository bound to one table.
pub struct SqliteRepository<'db, R: Record> {
    db: &'db Database,
    table: String,
    descriptor: Arc<RecordDescriptor>,
    statements: Statements,
    _record: PhantomData<fn() -> R>,
}

#[derive(Debug, Clone)]
struct Statements {
    select: String,
    find_by_id: String,
    find_all: String,
    insert: String,
    update: String,
    soft_delete: String,
    hard_delete: String,
}

impl Statements {
    fn build(table: &str, descriptor: &RecordDescriptor, soft_delete_column: &str) -> Self {
        let fragments = descriptor.fragments();
        let table = quote_identifier(table);
        let id = quote_identifier(IDENTITY_COLUMN);
        let select = format!("SELECT {} FROM {table}", fragments.select_list);

        Self {
            find_by_id: format!("{select} WHERE {id} = :{IDENTITY_COLUMN}"),
            find_all: format!(
                "{select} WHERE true ORDER BY {id} DESC LIMIT :limit OFFSET :offset"
            ),
            insert: format!(
                "INSERT INTO {table}({}) VALUES ({}) RETURNING {}",
                fragments.insert_list, fragments.insert_placeholders, fragments.select_list
            ),
            update: format!(
                "UPDATE {table} SET {} WHERE {id} = :{IDENTITY_COLUMN} RETURNING {}",
                fragments.update_assignments, fragments.select_list
            ),
            soft_delete: format!(
                "UPDATE {table} SET {} = :{soft_delete_column} WHERE {id} = :{IDENTITY_COLUMN}",
                quote_identifier(soft_delete_column)
            ),
            hard_delete: format!("DELETE FROM {table} WHERE {id} = :{IDENTITY_COLUMN}"),
            select,
        }
    }
}

impl<'db, R: Record> SqliteRepository<'db, R> {
    /// Creates a repository over `R::TABLE`.
    pub fn try_new(db: &'db Database) -> DbResult<Self> {
        Self::try_with_table(db, R::TABLE)
    }

    /// Creates a repository over an explicit table name.
    ///
    /// # Errors
    /// - `DbError::InvalidIdentifier` when `table` or a declared column is
    ///   not a plain identifier.
    /// - `DbError::DuplicateColumn` when `R` declares a column twice.
    pub fn try_with_table(db: &'db Database, table: impl Into<String>) -> DbResult<Self> {
        let table = table.into();
        validate_identifier(&table)?;
        let descriptor = RecordDescriptor::of::<R>()?;
        let statements = Statements::build(&table, &descriptor, R::SOFT_DELETE_COLUMN);

        Ok(Self {
            db,
            table,
            descriptor,
            statements,
            _record: PhantomData,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn descriptor(&self) -> &RecordDescriptor {
        &self.descriptor
    }

    fn instrument<T>(
        &self,
        op: &'static str,
        run: impl FnOnce() -> RepoResult<T>,
    ) -> RepoResult<T> {
        let started_at = Instant::now();
        let result = run();
        let duration_ms = started_at.elapsed().as_millis();
        match &result {
            Ok(_) => debug!(
                "event=repo_op module=repo op={op} table={} status=ok duration_ms={duration_ms}",
                self.table
            ),
            Err(RepoError::NotFound { .. }) => debug!(
                "event=repo_op module=repo op={op} table={} status=not_found duration_ms={duration_ms}",
                self.table
            ),
            Err(err) => warn!(
                "event=repo_op module=repo op={op} table={} status=error duration_ms={duration_ms} error={err}",
                self.table
            ),
        }
        result
    }

    fn query_rows(&self, conn: &Connection, sql: &str, args: &Args) -> RepoResult<Vec<R>> {
        let bound = bind_named(sql, args)?;
        let mut stmt = conn.prepare_cached(&bound.sql)?;
        let rows = stmt.query_map(params_from_iter(bound.values.iter()), R::from_row)?;
        let records = rows.collect::<rusqlite::Result<Vec<R>>>()?;
        Ok(records)
    }

    fn query_one(&self, conn: &Connection, sql: &str, args: &Args) -> RepoResult<R> {
        let bound = bind_named(sql, args)?;
        let mut stmt = conn.prepare_cached(&bound.sql)?;
        let mut rows = stmt.query(params_from_iter(bound.values.iter()))?;
        let record = match rows.next()? {
            Some(row) => R::from_row(row)?,
            None => return Err(RepoError::not_found(self.table.as_str())),
        };
        Ok(record)
    }

    fn execute(&self, conn: &Connection, sql: &str, args: &Args) -> RepoResult<usize> {
        let bound = bind_named(sql, args)?;
        let mut stmt = conn.prepare_cached(&bound.sql)?;
        Ok(stmt.execute(params_from_iter(bound.values.iter()))?)
    }

    // Named arguments for every persisted column of `record`.
    fn record_args(&self, record: &R) -> RepoResult<Args> {
        let mut args = Args::new();
        for (column, meta) in R::COLUMNS.iter().zip(self.descriptor.fields()) {
            if let Some(name) = meta.column {
                args.set(name, column.value(record)?);
            }
        }
        Ok(args)
    }

    fn identity_value(&self, record: &R) -> RepoResult<Value> {
        let position = self
            .descriptor
            .fields()
            .iter()
            .position(|field| field.identity)
            .ok_or(DbError::MissingIdentity(self.descriptor.record()))?;
        Ok(R::COLUMNS[position].value(record)?)
    }

    fn id_args(id: R::Id) -> Args {
        Args::new().with(IDENTITY_COLUMN, id)
    }

    fn require_identity(&self) -> RepoResult<()> {
        match self.descriptor.identity() {
            Some(_) => Ok(()),
            None => Err(DbError::MissingIdentity(self.descriptor.record()).into()),
        }
    }
}

impl<R: Record> GenericRepository<R> for SqliteRepository<'_, R> {
    fn single(&self, ctx: &Context<'_>, filter: &str, args: &Args) -> RepoResult<R> {
        self.instrument("single", || {
            let conn = self.db.executor(ctx)?;
            let sql = format!("{} WHERE {filter}", self.statements.select);
            self.query_one(&conn, &sql, args)
        })
    }

    fn filter(&self, ctx: &Context<'_>, filter: &str, args: &Args) -> RepoResult<Vec<R>> {
        self.instrument("filter", || {
            let conn = self.db.executor(ctx)?;
            let sql = format!("{} WHERE {filter}", self.statements.select);
            self.query_rows(&conn, &sql, args)
        })
    }

    fn select_with_query(
        &self,
        ctx: &Context<'_>,
        query: &str,
        args: &Args,
    ) -> RepoResult<Vec<R>> {
        self.instrument("select_with_query", || {
            let conn = self.db.executor(ctx)?;
            self.query_rows(&conn, query, args)
        })
    }

    fn find_by_id(&self, ctx: &Context<'_>, id: R::Id) -> RepoResult<R> {
        self.instrument("find_by_id", || {
            self.require_identity()?;
            let conn = self.db.executor(ctx)?;
            self.query_one(&conn, &self.statements.find_by_id, &Self::id_args(id))
        })
    }

    fn find_all(&self, ctx: &Context<'_>, page: i64, limit: i64) -> RepoResult<Vec<R>> {
        self.instrument("find_all", || {
            self.require_identity()?;
            let offset = page_offset(page, limit)?;
            let conn = self.db.executor(ctx)?;
            let args = Args::new().with("limit", limit).with("offset", offset);
            self.query_rows(&conn, &self.statements.find_all, &args)
        })
    }

    fn insert(&self, ctx: &Context<'_>, record: &mut R) -> RepoResult<()> {
        self.instrument("insert", || {
            let args = self.record_args(record)?;
            let conn = self.db.executor(ctx)?;
            *record = self.query_one(&conn, &self.statements.insert, &args)?;
            Ok(())
        })
    }

    fn update(&self, ctx: &Context<'_>, record: &mut R) -> RepoResult<()> {
        self.instrument("update", || {
            let id = self.identity_value(record)?;
            let args = self.record_args(record)?;
            let conn = self.db.executor(ctx)?;

            let lookup = Args::new().with(IDENTITY_COLUMN, id);
            self.query_one(&conn, &self.statements.find_by_id, &lookup)?;

            *record = self.query_one(&conn, &self.statements.update, &args)?;
            Ok(())
        })
    }

    fn delete(&self, ctx: &Context<'_>, id: R::Id) -> RepoResult<()> {
        self.instrument("delete", || {
            self.require_identity()?;
            let mut args = Self::id_args(id);
            args.set(R::SOFT_DELETE_COLUMN, to_value(&Utc::now())?);
            let conn = self.db.executor(ctx)?;
            let affected = self.execute(&conn, &self.statements.soft_delete, &args)?;
            debug!(
                "event=repo_soft_delete module=repo table={} rows_affected={affected}",
                self.table
            );
            Ok(())
        })
    }

    fn delete_hard(&self, ctx: &Context<'_>, id: R::Id) -> RepoResult<()> {
        self.instrument("delete_hard", || {
            self.require_identity()?;
            let conn = self.db.executor(ctx)?;
            let args = Self::id_args(id);
            let affected = self.execute(&conn, &self.statements.hard_delete, &args)?;
            debug!(
                "event=repo_hard_delete module=repo table={} rows_affected={affected}",
                self.table
            );
            Ok(())
        })
    }
}

impl<R: Record> std::fmt::Debug for SqliteRepository<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRepository")
            .field("table", &self.table)
            .field("record", &self.descriptor.record())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Statements;
    use crate::record::{to_value, Column, Record, RecordDescriptor};
    use rusqlite::Row;

    struct Ring {
        id: i64,
        bearer: String,
    }

    impl Record for Ring {
        const TABLE: &'static str = "rings";
        const COLUMNS: &'static [Column<Self>] = &[
            Column::new("id", "id", |r| to_value(&r.id)),
            Column::new("bearer", "bearer", |r| to_value(&r.bearer)),
        ];
        type Id = i64;

        fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
            Ok(Self {
                id: row.get("id")?,
                bearer: row.get("bearer")?,
            })
        }
    }

    #[test]
    fn statements_use_quoted_identifiers_and_named_placeholders() {
        let descriptor = RecordDescriptor::build::<Ring>().unwrap();
        let statements = Statements::build("rings", &descriptor, Ring::SOFT_DELETE_COLUMN);

        assert_eq!(
            statements.find_by_id,
            r#"SELECT "id","bearer" FROM "rings" WHERE "id" = :id"#
        );
        assert_eq!(
            statements.find_all,
            r#"SELECT "id","bearer" FROM "rings" WHERE true ORDER BY "id" DESC LIMIT :limit OFFSET :offset"#
        );
        assert_eq!(
            statements.insert,
            r#"INSERT INTO "rings"("bearer") VALUES (:bearer) RETURNING "id","bearer""#
        );
        assert_eq!(
            statements.update,
            r#"UPDATE "rings" SET "bearer" = :bearer WHERE "id" = :id RETURNING "id","bearer""#
        );
        assert_eq!(
            statements.soft_delete,
            r#"UPDATE "rings" SET "deletedAt" = :deletedAt WHERE "id" = :id"#
        );
        assert_eq!(
            statements.hard_delete,
            r#"DELETE FROM "rings" WHERE "id" = :id"#
        );
    }

    #[test]
    fn fixture_rows_decode() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let ring = conn
            .query_row("SELECT 1 AS id, 'Frodo' AS bearer", [], Ring::from_row)
            .unwrap();
        assert_eq!(ring.id, 1);
        assert_eq!(ring.bearer, "Frodo");
    }
}
