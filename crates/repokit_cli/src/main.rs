//! Command-line front end for the character store.
//!
//! # Responsibility
//! - Open the configured SQLite file and drive `repokit_core` services.
//! - Keep output deterministic: one line per character, or JSON.

use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use repokit_core::config::ENV_LOG_LEVEL;
use repokit_core::{
    init_logging, open_db, seed_characters, Character, CharacterChanges, CharacterListQuery,
    CharacterService, Context, Database, Manager, NewCharacter, SqliteRepository, StoreConfig,
    CHARACTERS_DDL,
};

const DEFAULT_DB_FILE: &str = "repokit.db";
const QUIET_LOG_LEVEL: &str = "warn";
const CLI_ACTOR: &str = "cli";

#[derive(Parser)]
#[command(name = "repokit")]
#[command(author, version, about = "Character store backed by the generic repository", long_about = None)]
struct Cli {
    /// SQLite file (default: REPOKIT_DB_PATH or ./repokit.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Directory for rolling log files (default: REPOKIT_LOG_DIR, else stderr)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Log level: trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the characters table if missing
    Init,
    /// Insert the demo characters in one unit of work
    Seed,
    /// List active characters, newest first
    List {
        /// Case-insensitive name filter
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        page: Option<i64>,
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
    /// Show one active character
    Get {
        id: i64,
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
    /// Create a character
    Create {
        #[arg(long = "type")]
        character_type_id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        power: i64,
    },
    /// Change a character's power
    SetPower { id: i64, power: i64 },
    /// Soft-delete a character, or remove it with --hard
    Delete {
        id: i64,
        #[arg(long)]
        hard: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    init_logging(&config.logging).context("failed to initialize logging")?;

    let db = open_db(&config.database).context("failed to open database")?;
    let ctx = Context::background();

    run_command(cli.command, &db, &ctx)
}

fn run_command(command: Commands, db: &Database, ctx: &Context<'_>) -> Result<()> {
    let repo = SqliteRepository::<Character>::try_new(db)?;
    let service = CharacterService::new(repo);

    match command {
        Commands::Init => {
            db.with_connection(|conn| conn.execute_batch(CHARACTERS_DDL))
                .context("failed to create schema")?;
            info!("event=cli_init module=cli status=ok");
            println!("initialized");
        }
        Commands::Seed => {
            let inserted = seed_characters(&Manager::new(db), &service, ctx)?;
            println!("seeded {} character(s)", inserted.len());
        }
        Commands::List {
            name,
            page,
            limit,
            format,
        } => {
            let query = CharacterListQuery {
                id: None,
                name,
                page,
                limit,
            };
            let (characters, total) = service.list(ctx, &query)?;
            match format {
                Format::Json => println!(
                    "{}",
                    serde_json::json!({ "items": characters, "total": total })
                ),
                Format::Table => {
                    characters.iter().for_each(print_row);
                    println!("total={total}");
                }
            }
        }
        Commands::Get { id, format } => {
            let character = service.get(ctx, id)?;
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&character)?),
                Format::Table => print_row(&character),
            }
        }
        Commands::Create {
            character_type_id,
            name,
            power,
        } => {
            if power < 0 {
                bail!("power must not be negative");
            }
            let character = service.create(
                ctx,
                NewCharacter {
                    character_type_id,
                    name,
                    power,
                    actor: CLI_ACTOR.to_string(),
                },
            )?;
            print_row(&character);
        }
        Commands::SetPower { id, power } => {
            if power < 0 {
                bail!("power must not be negative");
            }
            let changes = CharacterChanges {
                power: Some(power),
                actor: Some(CLI_ACTOR.to_string()),
                ..CharacterChanges::default()
            };
            let character = service.update(ctx, id, changes)?;
            print_row(&character);
        }
        Commands::Delete { id, hard } => {
            if hard {
                service.purge(ctx, id)?;
            } else {
                service.delete(ctx, id)?;
            }
            println!("deleted id={id} hard={hard}");
        }
    }

    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<StoreConfig> {
    let mut config = StoreConfig::from_env()?;

    if let Some(path) = &cli.db {
        config.database.path = Some(path.clone());
    }
    if config.database.path.is_none() {
        config.database.path = Some(PathBuf::from(DEFAULT_DB_FILE));
    }

    if let Some(dir) = &cli.log_dir {
        config.logging.log_dir = Some(dir.clone());
    }
    if let Some(dir) = config.logging.log_dir.take() {
        let dir = if dir.is_relative() {
            std::env::current_dir()
                .context("failed to resolve working directory")?
                .join(dir)
        } else {
            dir
        };
        config.logging.log_dir = Some(dir);
    }

    let level_from_env = std::env::var_os(ENV_LOG_LEVEL).is_some();
    match &cli.log_level {
        Some(level) => config.logging.level = level.clone(),
        // stderr is shared with command output; keep it quiet unless asked.
        None if config.logging.log_dir.is_none() && !level_from_env => {
            config.logging.level = QUIET_LOG_LEVEL.to_string()
        }
        None => {}
    }

    Ok(config)
}

fn print_row(character: &Character) {
    println!(
        "{:>5}  type={}  {:<16} power={:<5} value={}",
        character.id,
        character.character_type_id,
        character.name,
        character.power,
        character.value
    );
}
