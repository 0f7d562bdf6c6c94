//! Command-line surface over the frontend and backend-mock helpers.

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

use localstash::backend::BackendDb;
use localstash::config::Config;
use localstash::entities::NewContent;
use localstash::frontend::FrontendDb;
use localstash::store::{Database, DatabaseKind};
use localstash::sweeper;

#[derive(Parser, Debug)]
#[command(name = "localstash")]
#[command(about = "Settings, drafts, cache and recent items in a local SQLite store")]
#[command(version)]
pub struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/localstash/config.yaml)
  #[arg(short, long)]
  pub config: Option<PathBuf>,

  /// Directory holding the database files
  #[arg(short, long)]
  pub data_dir: Option<PathBuf>,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Target {
  Frontend,
  Backend,
  All,
}

impl Target {
  fn frontend(self) -> bool {
    matches!(self, Self::Frontend | Self::All)
  }

  fn backend(self) -> bool {
    matches!(self, Self::Backend | Self::All)
  }
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Seed empty tables and sweep expired cache entries
  Init {
    #[arg(long, value_enum, default_value_t = Target::All)]
    db: Target,
  },
  /// Empty every table
  Clear {
    #[arg(long, value_enum, default_value_t = Target::All)]
    db: Target,
  },
  /// Clear, then initialize
  Reset {
    #[arg(long, value_enum, default_value_t = Target::All)]
    db: Target,
  },
  /// User settings
  #[command(subcommand)]
  Setting(SettingCommand),
  /// Drafts of unsaved work
  #[command(subcommand)]
  Draft(DraftCommand),
  /// Expiring cache
  #[command(subcommand)]
  Cache(CacheCommand),
  /// Recently viewed items
  #[command(subcommand)]
  Recent(RecentCommand),
  /// Backend-mock tables
  #[command(subcommand)]
  Backend(BackendCommand),
}

#[derive(Subcommand, Debug)]
pub enum SettingCommand {
  Get { key: String },
  /// VALUE is parsed as JSON, falling back to a plain string
  Set { key: String, value: String },
  Delete { key: String },
  List,
}

#[derive(Subcommand, Debug)]
pub enum DraftCommand {
  /// CONTENT must be a JSON object or array
  Save {
    #[arg(value_name = "TYPE")]
    draft_type: String,
    content: String,
    #[arg(long)]
    reference: Option<i64>,
  },
  Get {
    #[arg(value_name = "TYPE")]
    draft_type: String,
    #[arg(long)]
    reference: Option<i64>,
  },
  List {
    #[arg(value_name = "TYPE")]
    draft_type: String,
  },
  Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
  Get { key: String },
  /// DATA must be a JSON object or array
  Set {
    key: String,
    data: String,
    /// Time to live in seconds (default from config, one hour)
    #[arg(long)]
    ttl: Option<u64>,
  },
  ClearExpired,
  Clear,
  /// Sweep expired entries periodically until Ctrl-C
  Sweep {
    /// Seconds between sweeps
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    every: u64,
  },
}

#[derive(Subcommand, Debug)]
pub enum RecentCommand {
  Add { item_type: String, item_id: i64 },
  List {
    item_type: String,
    #[arg(long)]
    limit: Option<usize>,
  },
  Clear { item_type: Option<String> },
}

#[derive(Subcommand, Debug)]
pub enum BackendCommand {
  Items,
  Users,
  Contents,
  /// Create shared content
  AddContent {
    #[arg(long)]
    alias: String,
    #[arg(long)]
    title: String,
    #[arg(long)]
    content: String,
    #[arg(long)]
    author: String,
    #[arg(long)]
    private: bool,
  },
  /// Show content by id or alias and count the view
  ShowContent { id_or_alias: String },
}

pub async fn run(command: Command, config: &Config) -> Result<()> {
  match command {
    Command::Init { db } => {
      if db.frontend() {
        open_frontend(config)?.initialize()?;
      }
      if db.backend() {
        print_json(&open_backend(config)?.initialize()?)?;
      }
    }
    Command::Clear { db } => {
      if db.frontend() {
        open_frontend(config)?.clear()?;
      }
      if db.backend() {
        open_backend(config)?.clear()?;
      }
    }
    Command::Reset { db } => {
      if db.frontend() {
        open_frontend(config)?.reset()?;
      }
      if db.backend() {
        print_json(&open_backend(config)?.reset()?)?;
      }
    }
    Command::Setting(cmd) => run_setting(cmd, &open_frontend(config)?)?,
    Command::Draft(cmd) => run_draft(cmd, &open_frontend(config)?)?,
    Command::Cache(cmd) => run_cache(cmd, &open_frontend(config)?).await?,
    Command::Recent(cmd) => run_recent(cmd, &open_frontend(config)?)?,
    Command::Backend(cmd) => run_backend(cmd, &open_backend(config)?)?,
  }

  Ok(())
}

fn run_setting(cmd: SettingCommand, db: &FrontendDb) -> Result<()> {
  match cmd {
    SettingCommand::Get { key } => print_json(&db.settings().get::<Value>(&key)?)?,
    SettingCommand::Set { key, value } => {
      let value = serde_json::from_str::<Value>(&value).unwrap_or(Value::String(value));
      db.settings().set(&key, &value)?;
    }
    SettingCommand::Delete { key } => db.settings().delete(&key)?,
    SettingCommand::List => print_json(&db.settings().list()?)?,
  }
  Ok(())
}

fn run_draft(cmd: DraftCommand, db: &FrontendDb) -> Result<()> {
  match cmd {
    DraftCommand::Save {
      draft_type,
      content,
      reference,
    } => {
      let content = parse_json_arg("content", &content)?;
      let id = db.drafts().save(&draft_type, &content, reference)?;
      print_json(&id)?;
    }
    DraftCommand::Get {
      draft_type,
      reference,
    } => print_json(&db.drafts().get(&draft_type, reference)?)?,
    DraftCommand::List { draft_type } => print_json(&db.drafts().list_by_type(&draft_type)?)?,
    DraftCommand::Delete { id } => db.drafts().delete(id)?,
  }
  Ok(())
}

async fn run_cache(cmd: CacheCommand, db: &FrontendDb) -> Result<()> {
  match cmd {
    CacheCommand::Get { key } => print_json(&db.cache().get::<Value>(&key)?)?,
    CacheCommand::Set { key, data, ttl } => {
      let data = parse_json_arg("data", &data)?;
      db.cache().set(&key, &data, ttl.map(Duration::from_secs))?;
    }
    CacheCommand::ClearExpired => print_json(&db.cache().clear_expired()?)?,
    CacheCommand::Clear => print_json(&db.cache().clear_all()?)?,
    CacheCommand::Sweep { every } => {
      info!(every, "starting cache sweep");
      let shutdown = until_interrupted(tokio::signal::ctrl_c());
      let removed = sweeper::sweep_until(db, Duration::from_secs(every), shutdown).await?;
      info!(removed, "cache sweep stopped");
      print_json(&removed)?;
    }
  }
  Ok(())
}

fn run_recent(cmd: RecentCommand, db: &FrontendDb) -> Result<()> {
  match cmd {
    RecentCommand::Add { item_type, item_id } => db.recent().add(&item_type, item_id)?,
    RecentCommand::List { item_type, limit } => print_json(&db.recent().get(&item_type, limit)?)?,
    RecentCommand::Clear { item_type } => print_json(&db.recent().clear(item_type.as_deref())?)?,
  }
  Ok(())
}

fn run_backend(cmd: BackendCommand, db: &BackendDb) -> Result<()> {
  match cmd {
    BackendCommand::Items => print_json(&db.items()?)?,
    BackendCommand::Users => print_json(&db.users()?)?,
    BackendCommand::Contents => print_json(&db.contents()?)?,
    BackendCommand::AddContent {
      alias,
      title,
      content,
      author,
      private,
    } => {
      let created = db.insert_content(&NewContent {
        alias,
        title,
        content,
        author,
        is_public: !private,
      })?;
      print_json(&created)?;
    }
    BackendCommand::ShowContent { id_or_alias } => {
      let found = match id_or_alias.parse::<i64>() {
        Ok(id) => db.get_content(id)?,
        Err(_) => db.get_content_by_alias(&id_or_alias)?,
      };
      let viewed = match found {
        Some(content) => db.record_content_view(content.id)?,
        None => None,
      };
      print_json(&viewed)?;
    }
  }
  Ok(())
}

/// Resolves once `signal` fires. If the handler cannot be installed the
/// error is logged and this never resolves, so the caller keeps running.
async fn until_interrupted<F>(signal: F)
where
  F: Future<Output = std::io::Result<()>>,
{
  if let Err(e) = signal.await {
    error!(error = %e, "failed to listen for ctrl-c; sweep runs until killed");
    std::future::pending::<()>().await;
  }
}

fn open_frontend(config: &Config) -> Result<FrontendDb> {
  let db = Database::open(&config.data_dir()?, DatabaseKind::Frontend)?;
  Ok(FrontendDb::new(db).with_default_ttl(config.default_ttl()))
}

fn open_backend(config: &Config) -> Result<BackendDb> {
  let db = Database::open(&config.data_dir()?, DatabaseKind::Backend)?;
  Ok(BackendDb::new(db))
}

fn parse_json_arg(name: &str, raw: &str) -> Result<Value> {
  serde_json::from_str(raw).map_err(|e| eyre!("{} is not valid JSON: {}", name, e))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parses_nested_subcommands() {
    let args = Args::try_parse_from([
      "localstash",
      "--data-dir",
      "/tmp/x",
      "draft",
      "save",
      "item",
      "{\"a\":1}",
      "--reference",
      "7",
    ])
    .unwrap();

    assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/x")));
    match args.command {
      Command::Draft(DraftCommand::Save {
        draft_type,
        reference,
        ..
      }) => {
        assert_eq!(draft_type, "item");
        assert_eq!(reference, Some(7));
      }
      other => panic!("unexpected command {:?}", other),
    }
  }

  #[test]
  fn test_lifecycle_target_defaults_to_all() {
    let args = Args::try_parse_from(["localstash", "reset"]).unwrap();
    assert!(matches!(args.command, Command::Reset { db: Target::All }));
  }

  #[test]
  fn test_sweep_interval_must_be_positive() {
    assert!(Args::try_parse_from(["localstash", "cache", "sweep", "--every", "0"]).is_err());
  }

  #[tokio::test]
  async fn test_interrupt_resolves_when_signal_fires() {
    let fired = tokio::time::timeout(
      Duration::from_millis(50),
      until_interrupted(async { Ok(()) }),
    )
    .await;
    assert!(fired.is_ok());
  }

  #[tokio::test]
  async fn test_failed_signal_handler_does_not_stop_the_sweep() {
    let fired = tokio::time::timeout(
      Duration::from_millis(50),
      until_interrupted(async { Err(std::io::Error::other("no signal driver")) }),
    )
    .await;
    assert!(fired.is_err());
  }

  #[test]
  fn test_json_arg_errors_name_the_field() {
    let err = parse_json_arg("content", "{oops").unwrap_err();
    assert!(err.to_string().starts_with("content is not valid JSON"));
  }
}
