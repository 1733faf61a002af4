#![allow(dead_code)]

use repokit_core::{open_db_in_memory, Character, Database, CHARACTERS_DDL};

/// In-memory database with the characters table.
pub fn character_db() -> Database {
    let db = open_db_in_memory().unwrap();
    db.with_connection(|conn| conn.execute_batch(CHARACTERS_DDL))
        .unwrap();
    db
}

pub fn count_rows(db: &Database, table: &str) -> i64 {
    db.with_connection(|conn| {
        conn.query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
            row.get(0)
        })
    })
    .unwrap()
}

pub fn gandalf() -> Character {
    Character::new(1, "Gandalf", 100).with_actor("tests")
}
