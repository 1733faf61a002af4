//! Character use-case service.
//!
//! # Responsibility
//! - Apply the character storage conventions on top of the generic
//!   repository: the `"deletedAt" IS NULL` filter, newest-first listing and
//!   the derived `value` field.
//!
//! # Invariants
//! - Reads never return soft-deleted characters.
//! - Returned characters always carry a freshly computed `value`.
//! - The service stays storage-agnostic; it only talks to `GenericRepository`.

use chrono::Utc;

use crate::context::Context;
use crate::model::character::{Character, CharacterId};
use crate::query::{page_offset, Args};
use crate::repo::{GenericRepository, RepoResult};

const ACTIVE_FILTER: &str = r#""deletedAt" IS NULL"#;

/// Listing filters. Zero or empty fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterListQuery {
    pub id: Option<CharacterId>,
    /// Case-insensitive substring match on `name`.
    pub name: Option<String>,
    /// 1-based page; paging applies only when both `page` and `limit` are set.
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCharacter {
    pub character_type_id: i64,
    pub name: String,
    pub power: i64,
    pub actor: String,
}

/// Partial change set; `None` leaves the field as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterChanges {
    pub name: Option<String>,
    pub power: Option<i64>,
    pub actor: Option<String>,
}

pub struct CharacterService<R: GenericRepository<Character>> {
    repo: R,
}

impl<R: GenericRepository<Character>> CharacterService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Lists active characters, newest first.
    ///
    /// Returns the requested page and the number of characters matching the
    /// filters across all pages.
    pub fn list(
        &self,
        ctx: &Context<'_>,
        query: &CharacterListQuery,
    ) -> RepoResult<(Vec<Character>, usize)> {
        let mut filter = String::from(ACTIVE_FILTER);
        let mut args = Args::new();

        if let Some(id) = query.id.filter(|id| *id != 0) {
            filter.push_str(r#" AND "id" = :id"#);
            args.set("id", id);
        }
        if let Some(name) = query.name.as_deref().filter(|name| !name.is_empty()) {
            filter.push_str(r#" AND "name" LIKE :name"#);
            args.set("name", format!("%{name}%"));
        }
        filter.push_str(r#" ORDER BY "createdAt" DESC, "id" DESC"#);

        let total = self.repo.filter(ctx, &filter, &args)?.len();

        if let (Some(page), Some(limit)) = (query.page, query.limit) {
            if page > 0 && limit > 0 {
                filter.push_str(" LIMIT :limit OFFSET :offset");
                args.set("limit", limit);
                args.set("offset", page_offset(page, limit)?);
            }
        }

        let mut characters = self.repo.filter(ctx, &filter, &args)?;
        characters.iter_mut().for_each(Character::refresh_value);

        Ok((characters, total))
    }

    /// Returns an active character; soft-deleted ones are `NotFound`.
    pub fn get(&self, ctx: &Context<'_>, id: CharacterId) -> RepoResult<Character> {
        let filter = format!(r#"{ACTIVE_FILTER} AND "id" = :id"#);
        let mut character = self.repo.single(ctx, &filter, &Args::new().with("id", id))?;
        character.refresh_value();
        Ok(character)
    }

    pub fn create(&self, ctx: &Context<'_>, input: NewCharacter) -> RepoResult<Character> {
        let mut character = Character::new(input.character_type_id, input.name, input.power)
            .with_actor(input.actor);
        self.repo.insert(ctx, &mut character)?;
        character.refresh_value();
        Ok(character)
    }

    /// Applies `changes` to an active character and stores the whole row.
    pub fn update(
        &self,
        ctx: &Context<'_>,
        id: CharacterId,
        changes: CharacterChanges,
    ) -> RepoResult<Character> {
        let mut character = self.get(ctx, id)?;
        if let Some(name) = changes.name.filter(|name| !name.is_empty()) {
            character.name = name;
        }
        if let Some(power) = changes.power {
            character.power = power;
        }
        if let Some(actor) = changes.actor {
            character.updated_by = actor;
        }
        character.updated_at = Some(Utc::now());

        self.repo.update(ctx, &mut character)?;
        character.refresh_value();
        Ok(character)
    }

    /// Soft-deletes an active character.
    pub fn delete(&self, ctx: &Context<'_>, id: CharacterId) -> RepoResult<()> {
        self.get(ctx, id)?;
        self.repo.delete(ctx, id)
    }

    /// Removes the row permanently, whether or not it was soft-deleted.
    pub fn purge(&self, ctx: &Context<'_>, id: CharacterId) -> RepoResult<()> {
        self.repo.delete_hard(ctx, id)
    }
}
