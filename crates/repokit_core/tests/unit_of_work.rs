mod common;

use std::panic::{catch_unwind, AssertUnwindSafe};

use common::{character_db, count_rows, gandalf};
use repokit_core::record::to_value;
use repokit_core::{
    Args, Character, Column, Context, DbError, GenericRepository, Manager, Record, RepoError,
    SqliteRepository,
};
use rusqlite::Row;

#[derive(Debug)]
enum AppError {
    Repo(RepoError),
    Aborted(&'static str),
}

impl From<DbError> for AppError {
    fn from(value: DbError) -> Self {
        Self::Repo(value.into())
    }
}

impl From<RepoError> for AppError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

#[test]
fn failing_body_rolls_back_every_write() {
    let db = character_db();
    let repo = SqliteRepository::<Character>::try_new(&db).unwrap();
    let manager = Manager::new(&db);

    let result: Result<(), AppError> =
        manager.run_in_transaction(&Context::background(), |ctx| {
            repo.insert(ctx, &mut gandalf())?;
            repo.insert(ctx, &mut Character::new(2, "Legolas", 60))?;
            Err(AppError::Aborted("second thoughts"))
        });

    assert!(matches!(result, Err(AppError::Aborted("second thoughts"))));
    assert_eq!(count_rows(&db, "characters"), 0);
}

#[test]
fn successful_body_commits_and_returns_value() {
    let db = character_db();
    let repo = SqliteRepository::<Character>::try_new(&db).unwrap();
    let manager = Manager::new(&db);

    let ids = manager
        .run_in_transaction(&Context::background(), |ctx| -> Result<_, RepoError> {
            let mut first = gandalf();
            let mut second = Character::new(3, "Frodo", 10);
            repo.insert(ctx, &mut first)?;
            repo.insert(ctx, &mut second)?;
            Ok((first.id, second.id))
        })
        .unwrap();

    let ctx = Context::background();
    assert_eq!(repo.find_by_id(&ctx, ids.0).unwrap().name, "Gandalf");
    assert_eq!(repo.find_by_id(&ctx, ids.1).unwrap().name, "Frodo");
}

#[test]
fn body_reads_its_own_uncommitted_writes() {
    let db = character_db();
    let repo = SqliteRepository::<Character>::try_new(&db).unwrap();
    let manager = Manager::new(&db);

    let seen = manager
        .run_in_transaction(&Context::background(), |ctx| -> Result<_, RepoError> {
            let mut character = gandalf();
            repo.insert(ctx, &mut character)?;
            character.power = 150;
            repo.update(ctx, &mut character)?;
            repo.find_by_id(ctx, character.id)
        })
        .unwrap();

    assert_eq!(seen.power, 150);
}

#[test]
fn not_found_inside_body_rolls_back_and_is_returned_unchanged() {
    let db = character_db();
    let repo = SqliteRepository::<Character>::try_new(&db).unwrap();
    let manager = Manager::new(&db);

    let err = manager
        .run_in_transaction(&Context::background(), |ctx| {
            repo.insert(ctx, &mut gandalf())?;
            repo.single(ctx, r#""name" = :name"#, &Args::new().with("name", "Sauron".to_string()))
        })
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(count_rows(&db, "characters"), 0);
}

#[test]
fn nested_unit_of_work_is_rejected() {
    let db = character_db();
    let repo = SqliteRepository::<Character>::try_new(&db).unwrap();
    let manager = Manager::new(&db);

    let result = manager.run_in_transaction(&Context::background(), |ctx| {
        repo.insert(ctx, &mut gandalf())?;
        manager.run_in_transaction(ctx, |inner| {
            repo.insert(inner, &mut Character::new(2, "Legolas", 60))
        })
    });

    assert!(matches!(
        result,
        Err(RepoError::Db(DbError::NestedTransaction))
    ));
    assert_eq!(count_rows(&db, "characters"), 0);
}

#[test]
fn default_connection_inside_unit_of_work_fails_fast() {
    let db = character_db();
    let repo = SqliteRepository::<Character>::try_new(&db).unwrap();
    let manager = Manager::new(&db);

    let result = manager.run_in_transaction(&Context::background(), |ctx| {
        repo.insert(ctx, &mut gandalf())?;
        repo.find_all(&Context::background(), 1, 10)
    });

    assert!(matches!(
        result,
        Err(RepoError::Db(DbError::ConnectionRequestedInsideTransaction))
    ));
    assert_eq!(count_rows(&db, "characters"), 0);
}

#[test]
fn panicking_body_rolls_back_and_database_stays_usable() {
    let db = character_db();
    let repo = SqliteRepository::<Character>::try_new(&db).unwrap();
    let manager = Manager::new(&db);

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        manager.run_in_transaction(&Context::background(), |ctx| -> Result<(), RepoError> {
            repo.insert(ctx, &mut gandalf())?;
            panic!("body exploded");
        })
    }));

    assert!(outcome.is_err());
    assert_eq!(count_rows(&db, "characters"), 0);

    let mut character = gandalf();
    repo.insert(&Context::background(), &mut character).unwrap();
    assert_eq!(count_rows(&db, "characters"), 1);
}

#[test]
fn units_of_work_on_separate_threads_serialize() {
    let db = character_db();
    let manager = Manager::new(&db);

    std::thread::scope(|scope| {
        for worker in 0..4_i64 {
            let db = &db;
            scope.spawn(move || {
                let repo = SqliteRepository::<Character>::try_new(db).unwrap();
                manager
                    .run_in_transaction(&Context::background(), |ctx| -> Result<(), RepoError> {
                        for n in 0..5 {
                            let name = format!("worker-{worker}-{n}");
                            repo.insert(ctx, &mut Character::new(1, name, n))?;
                        }
                        Ok(())
                    })
                    .unwrap();
            });
        }
    });

    assert_eq!(count_rows(&db, "characters"), 20);
}

#[test]
fn context_values_are_visible_inside_the_body() {
    let db = character_db();
    let manager = Manager::new(&db);
    let root = Context::background();
    let request = root.with_value("actor", "gandalf".to_string());

    let actor = manager
        .run_in_transaction(&request, |ctx| -> Result<_, RepoError> {
            assert!(ctx.is_transactional());
            Ok(ctx.value::<String>("actor").cloned())
        })
        .unwrap();

    assert_eq!(actor.as_deref(), Some("gandalf"));
}

const LINKS_DDL: &str = r#"
CREATE TABLE "owners" ("id" INTEGER PRIMARY KEY);
CREATE TABLE "links" (
    "id" INTEGER PRIMARY KEY AUTOINCREMENT,
    "ownerId" INTEGER NOT NULL
        REFERENCES "owners"("id") DEFERRABLE INITIALLY DEFERRED
);
"#;

#[derive(Debug)]
struct Link {
    id: i64,
    owner_id: i64,
}

impl Record for Link {
    const TABLE: &'static str = "links";
    const COLUMNS: &'static [Column<Self>] = &[
        Column::new("id", "id", |link| to_value(&link.id)),
        Column::new("owner_id", "ownerId", |link| to_value(&link.owner_id)),
    ];
    type Id = i64;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            owner_id: row.get("ownerId")?,
        })
    }
}

#[test]
fn failing_commit_is_returned_and_leaves_no_open_transaction() {
    let db = character_db();
    db.with_connection(|conn| conn.execute_batch(LINKS_DDL))
        .unwrap();
    let repo = SqliteRepository::<Link>::try_new(&db).unwrap();
    let manager = Manager::new(&db);

    let result = manager.run_in_transaction(&Context::background(), |ctx| {
        let mut link = Link { id: 0, owner_id: 99 };
        repo.insert(ctx, &mut link)?;
        assert!(link.id > 0);
        Ok::<_, RepoError>(link.id)
    });

    assert!(matches!(result, Err(RepoError::Db(DbError::Sqlite(_)))));
    assert_eq!(count_rows(&db, "links"), 0);
    assert!(db.with_connection(|conn| Ok(conn.is_autocommit())).unwrap());

    db.with_connection(|conn| conn.execute(r#"INSERT INTO "owners"("id") VALUES (1)"#, []))
        .unwrap();
    let mut link = Link { id: 0, owner_id: 1 };
    repo.insert(&Context::background(), &mut link).unwrap();
    assert_eq!(count_rows(&db, "links"), 1);
}
