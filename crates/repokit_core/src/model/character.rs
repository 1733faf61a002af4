//! Character domain record.
//!
//! # Responsibility
//! - Define the persisted shape of a character and its column mapping.
//! - Provide the derived `value` rule, which is computed, never stored.
//!
//! # Invariants
//! - `id == 0` means "not inserted yet"; the store assigns the real id.
//! - `value` has no column and is filled by the service on reads.
//! - Soft-deleted rows keep their data; `deletedAt` is not part of the record.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::record::{to_value, Column, JsonMap, Record};

pub type CharacterId = i64;

/// Table definition used by the CLI `init` command and the test fixtures.
pub const CHARACTERS_DDL: &str = r#"CREATE TABLE IF NOT EXISTS "characters" (
    "id" INTEGER PRIMARY KEY AUTOINCREMENT,
    "characterTypeID" INTEGER NOT NULL,
    "name" TEXT NOT NULL,
    "power" INTEGER NOT NULL,
    "attributes" TEXT NOT NULL DEFAULT '{}',
    "createdAt" TEXT NOT NULL,
    "createdBy" TEXT NOT NULL DEFAULT '',
    "updatedAt" TEXT,
    "updatedBy" TEXT NOT NULL DEFAULT '',
    "deletedAt" TEXT
);"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: CharacterId,
    #[serde(rename = "characterTypeID")]
    pub character_type_id: i64,
    pub name: String,
    pub power: i64,
    /// Derived from `power` and `character_type_id`; see [`calculate_value`].
    pub value: i64,
    /// Free-form traits, stored as a JSON object.
    pub attributes: JsonMap,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: String,
}

impl Character {
    /// Builds an unsaved character stamped with the current time.
    pub fn new(character_type_id: i64, name: impl Into<String>, power: i64) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            character_type_id,
            name: name.into(),
            power,
            value: 0,
            attributes: JsonMap::default(),
            created_at: now,
            created_by: String::new(),
            updated_at: Some(now),
            updated_by: String::new(),
        }
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        let actor = actor.into();
        self.created_by = actor.clone();
        self.updated_by = actor;
        self
    }

    /// Recomputes `value` from the current power and type.
    pub fn refresh_value(&mut self) {
        self.value = calculate_value(self.power, self.character_type_id);
    }
}

impl Record for Character {
    const TABLE: &'static str = "characters";
    const COLUMNS: &'static [Column<Self>] = &[
        Column::new("id", "id", |c| to_value(&c.id)),
        Column::new("character_type_id", "characterTypeID", |c| {
            to_value(&c.character_type_id)
        }),
        Column::new("name", "name", |c| to_value(&c.name)),
        Column::new("power", "power", |c| to_value(&c.power)),
        Column::skipped("value"),
        Column::new("attributes", "attributes", |c| to_value(&c.attributes)),
        Column::new("created_at", "createdAt", |c| to_value(&c.created_at)),
        Column::new("created_by", "createdBy", |c| to_value(&c.created_by)),
        Column::new("updated_at", "updatedAt", |c| to_value(&c.updated_at)),
        Column::new("updated_by", "updatedBy", |c| to_value(&c.updated_by)),
    ];
    type Id = CharacterId;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            character_type_id: row.get("characterTypeID")?,
            name: row.get("name")?,
            power: row.get("power")?,
            value: 0,
            attributes: row.get("attributes")?,
            created_at: row.get("createdAt")?,
            created_by: row.get("createdBy")?,
            updated_at: row.get("updatedAt")?,
            updated_by: row.get("updatedBy")?,
        })
    }
}

/// Character value for a given power and type.
///
/// Type 1 scales power by 150%, type 2 by 110% plus 2, type 3 by 300% (200%
/// below power 20). Unknown types are worth nothing. Integer division
/// truncates toward zero.
pub fn calculate_value(power: i64, character_type_id: i64) -> i64 {
    let percent = |amount: i64| power * amount / 100;
    match character_type_id {
        1 => percent(150),
        2 => 2 + percent(110),
        3 if power < 20 => percent(200),
        3 => percent(300),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::{calculate_value, Character};
    use crate::record::RecordDescriptor;

    #[test]
    fn value_follows_type_rules() {
        assert_eq!(calculate_value(100, 1), 150);
        assert_eq!(calculate_value(60, 2), 68);
        assert_eq!(calculate_value(10, 3), 20);
        assert_eq!(calculate_value(20, 3), 60);
        assert_eq!(calculate_value(100, 0), 0);
        assert_eq!(calculate_value(100, 9), 0);
    }

    #[test]
    fn value_column_is_not_persisted() {
        let descriptor = RecordDescriptor::build::<Character>().unwrap();
        let fragments = descriptor.fragments();

        assert!(!fragments.select_list.contains("\"value\""));
        assert_eq!(
            fragments.insert_list,
            r#""characterTypeID","name","power","attributes","createdAt","createdBy","updatedAt","updatedBy""#
        );
        assert!(fragments
            .update_assignments
            .starts_with(r#""characterTypeID" = :characterTypeID,"name" = :name"#));
    }

    #[test]
    fn json_shape_uses_original_field_names() {
        let mut character = Character::new(1, "Gandalf", 100);
        character.refresh_value();
        let json = serde_json::to_value(&character).unwrap();

        assert_eq!(json["characterTypeID"], 1);
        assert_eq!(json["value"], 150);
        assert!(json.get("createdAt").is_some());
        assert!(json["attributes"].is_object());
    }
}
