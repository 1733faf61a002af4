//! Metadata-driven data access over SQLite.
//!
//! Records declare their columns once; a generic repository builds every
//! statement from that metadata, and a unit-of-work manager shares one
//! transaction across repository calls through the call context.

pub mod config;
pub mod context;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod record;
pub mod repo;
pub mod service;

pub use config::{ConfigError, DatabaseConfig, LoggingConfig, StoreConfig};
pub use context::Context;
pub use db::{open_db, open_db_in_memory, Database, DbError, DbResult, Executor, Manager};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::character::{calculate_value, Character, CharacterId, CHARACTERS_DDL};
pub use query::{bind_named, page_offset, Arg, Args, BindingError, BoundQuery};
pub use record::{Column, CodecError, Json, JsonMap, Record, RecordDescriptor, SqlFragments};
pub use repo::{GenericRepository, RepoError, RepoResult, SqliteRepository};
pub use service::character_service::{
    CharacterChanges, CharacterListQuery, CharacterService, NewCharacter,
};
pub use service::seed::seed_characters;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
