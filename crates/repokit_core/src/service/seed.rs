//! Demo seed data.

use log::info;

use crate::context::Context;
use crate::db::Manager;
use crate::model::character::Character;
use crate::repo::{GenericRepository, RepoResult};
use crate::service::character_service::{CharacterListQuery, CharacterService, NewCharacter};

/// `(character_type_id, name, power)` rows: a wizard, an elf and a hobbit.
pub const SEED_CHARACTERS: &[(i64, &str, i64)] =
    &[(1, "Gandalf", 100), (2, "Legolas", 60), (3, "Frodo", 10)];

pub const SEED_ACTOR: &str = "seeder";

/// Inserts the seed characters in one unit of work.
///
/// Names that already exist among active characters are skipped, so running
/// the seed twice does not duplicate rows. Returns the inserted characters.
pub fn seed_characters<R>(
    manager: &Manager<'_>,
    service: &CharacterService<R>,
    ctx: &Context<'_>,
) -> RepoResult<Vec<Character>>
where
    R: GenericRepository<Character>,
{
    let inserted = manager.run_in_transaction(ctx, |tx_ctx| -> RepoResult<Vec<Character>> {
        let mut inserted = Vec::new();
        for &(character_type_id, name, power) in SEED_CHARACTERS {
            let query = CharacterListQuery {
                name: Some(name.to_string()),
                ..CharacterListQuery::default()
            };
            let (existing, _) = service.list(tx_ctx, &query)?;
            if existing.iter().any(|character| character.name == name) {
                continue;
            }
            inserted.push(service.create(
                tx_ctx,
                NewCharacter {
                    character_type_id,
                    name: name.to_string(),
                    power,
                    actor: SEED_ACTOR.to_string(),
                },
            )?);
        }
        Ok(inserted)
    })?;

    info!(
        "event=seed module=service status=ok inserted={}",
        inserted.len()
    );
    Ok(inserted)
}
