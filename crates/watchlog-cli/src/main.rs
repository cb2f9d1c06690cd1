//! `watchlog` — command-line front end for a Watchlog library.
//!
//! Reads `watchlog.toml` (or the path given with `--config`), opens the
//! on-disk store (migrating it if it predates this build) and runs one
//! command against it.
//!
//! # Usage
//!
//! ```
//! watchlog status
//! watchlog add 129 "Spirited Away" --kind movie
//! watchlog add 60625 "Season 1" --kind season --season 1 --parent 24835
//! watchlog watch 129 watched --on 2024-03-01
//! watchlog export --out ~/Backups
//! watchlog import ~/Backups/Watchlog-20240301-093000.watchlogbackup
//! ```

mod settings;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use settings::{FileSettings, parse_value};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use watchlog_backup::{RestoreOptions, VersionPolicy};
use watchlog_core::{
  record::{CatalogId, MediaKind, NewRecord, Record, WatchState},
  settings::{Preference, SettingValue, SettingsStore},
  store::{KindFilter, RecordQuery, RecordStore},
};
use watchlog_store_sqlite::{StoreLocation, StoreManager};

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Track the films and shows you watch")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "watchlog.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Show where the library lives and its schema version.
  Status,

  /// List library records.
  List {
    #[arg(long, value_enum)]
    kind:      Option<KindArg>,
    /// Only favorites.
    #[arg(long)]
    favorites: bool,
    /// Include hidden placeholder series.
    #[arg(long)]
    all:       bool,
  },

  /// Save a title to the library.
  Add {
    catalog_id: CatalogId,
    name:       String,
    #[arg(long, value_enum, default_value = "movie")]
    kind:       KindArg,
    /// Season number; required with `--kind season`.
    #[arg(long)]
    season:     Option<u32>,
    /// Catalog ID of the series; required with `--kind season`.
    #[arg(long)]
    parent:     Option<CatalogId>,
  },

  /// Remove a title from the library.
  Remove { catalog_id: CatalogId },

  /// Toggle a title's favorite flag.
  Favorite { catalog_id: CatalogId },

  /// Change a title's watch state.
  Watch {
    catalog_id: CatalogId,
    #[arg(value_enum)]
    state:      StateArg,
    /// Day the change happened; defaults to today.
    #[arg(long)]
    on:         Option<NaiveDate>,
  },

  /// Write a backup archive.
  Export {
    /// Directory to write into; defaults to `backup_dir` from the config.
    #[arg(long)]
    out: Option<PathBuf>,
  },

  /// Replace the library and settings with a backup archive.
  Import {
    archive: PathBuf,
    /// Refuse archives from the running schema generation too.
    #[arg(long)]
    strict:  bool,
  },

  /// Read or write a preference.
  Pref {
    key:   String,
    /// New value; omitted to print the current one.
    value: Option<String>,
  },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
  Movie,
  Series,
  Season,
}

impl From<KindArg> for KindFilter {
  fn from(k: KindArg) -> Self {
    match k {
      KindArg::Movie => Self::Movie,
      KindArg::Series => Self::Series,
      KindArg::Season => Self::Season,
    }
  }
}

#[derive(Clone, Copy, ValueEnum)]
enum StateArg {
  Plan,
  Watching,
  Watched,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file. Every field may also be set
/// through a `WATCHLOG_` environment variable.
#[derive(Debug, Deserialize)]
struct AppConfig {
  /// Directory holding the store files; `<data dir>/watchlog` by default.
  #[serde(default)]
  data_dir:      Option<PathBuf>,
  #[serde(default = "default_store_name")]
  store_name:    String,
  #[serde(default)]
  settings_path: Option<PathBuf>,
  #[serde(default)]
  backup_dir:    Option<PathBuf>,
}

fn default_store_name() -> String { StoreLocation::DEFAULT_BASE_NAME.to_owned() }

struct Paths {
  data_dir:   PathBuf,
  settings:   PathBuf,
  backup_dir: PathBuf,
}

impl AppConfig {
  fn paths(&self) -> anyhow::Result<Paths> {
    let data_dir = match &self.data_dir {
      Some(dir) => expand_tilde(dir),
      None => dirs::data_dir()
        .context("no platform data directory; set data_dir in the config")?
        .join("watchlog"),
    };
    let settings = self
      .settings_path
      .as_deref()
      .map(expand_tilde)
      .unwrap_or_else(|| data_dir.join("settings.toml"));
    let backup_dir = self
      .backup_dir
      .as_deref()
      .map(expand_tilde)
      .unwrap_or_else(|| data_dir.join("backups"));
    Ok(Paths { data_dir, settings, backup_dir })
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let cfg: AppConfig = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("WATCHLOG"))
    .build()
    .context("failed to read config file")?
    .try_deserialize()
    .context("failed to deserialise AppConfig")?;
  let paths = cfg.paths()?;

  let location = StoreLocation::disk(&paths.data_dir, &cfg.store_name);
  let manager = StoreManager::open(location)
    .await
    .with_context(|| format!("failed to open library in {}", paths.data_dir.display()))?;
  let settings = FileSettings::load(&paths.settings)
    .with_context(|| format!("failed to load settings from {}", paths.settings.display()))?;

  let result = run(cli.command, &manager, &settings, &paths).await;
  manager.suspend().await.context("failed to close library")?;
  result
}

async fn run(
  command: Command,
  manager: &StoreManager,
  settings: &FileSettings,
  paths: &Paths,
) -> anyhow::Result<()> {
  match command {
    Command::Status => {
      let store = manager.store().await?;
      let on_disk = store.schema_version().await?;
      println!("library:  {}", display_opt(manager.location().main_file().as_deref()));
      println!("settings: {}", settings.path().display());
      match on_disk {
        Some(v) => println!("schema:   {v}"),
        None => println!("schema:   unknown"),
      }
      println!("records:  {}", store.count().await?);
    }

    Command::List { kind, favorites, all } => {
      let query = RecordQuery {
        kind: kind.map(Into::into),
        favorites_only: favorites,
        include_hidden: all,
        ..Default::default()
      };
      let store = manager.store().await?;
      for record in store.list(&query).await? {
        println!("{}", summary(&record));
      }
    }

    Command::Add { catalog_id, name, kind, season, parent } => {
      let kind = match kind {
        KindArg::Movie => MediaKind::Movie,
        KindArg::Series => MediaKind::Series,
        KindArg::Season => {
          let (Some(season_number), Some(parent_series_id)) = (season, parent) else {
            bail!("--kind season needs both --season and --parent");
          };
          MediaKind::Season { season_number, parent_series_id }
        }
      };
      let record = manager
        .store()
        .await?
        .insert(NewRecord::new(catalog_id, name, kind))
        .await
        .context("failed to save title")?;
      println!("{}", summary(&record));
    }

    Command::Remove { catalog_id } => {
      manager.store().await?.delete_by_catalog_id(catalog_id).await?;
    }

    Command::Favorite { catalog_id } => {
      let store = manager.store().await?;
      let record = find(&store, catalog_id).await?;
      if let Some(record) = store.toggle_favorite(record.record_id).await? {
        println!("{}", summary(&record));
      }
    }

    Command::Watch { catalog_id, state, on } => {
      let store = manager.store().await?;
      let record = find(&store, catalog_id).await?;
      let on = on.unwrap_or_else(|| Local::now().date_naive());
      let updated = store
        .update(record.record_id, move |r| match state {
          StateArg::Plan => r.mark_plan_to_watch(),
          StateArg::Watching => r.mark_watching(on),
          StateArg::Watched => r.mark_watched(on),
        })
        .await?;
      if let Some(record) = updated {
        println!("{}", summary(&record));
      }
    }

    Command::Export { out } => {
      let out = out.as_deref().map(expand_tilde).unwrap_or_else(|| paths.backup_dir.clone());
      settings.set(Preference::LastBackupAt, chrono::Utc::now().to_rfc3339().into())?;
      let path = watchlog_backup::create_backup(manager, settings, &out)
        .await
        .context("backup failed")?;
      println!("{}", path.display());
    }

    Command::Import { archive, strict } => {
      let options = RestoreOptions {
        version_policy: if strict { VersionPolicy::StrictlyOlder } else { VersionPolicy::NotNewer },
      };
      let report = watchlog_backup::restore(manager, settings, &expand_tilde(&archive), &options)
        .await
        .context("restore failed")?;
      match report.archive_version {
        Some(v) => println!("restored backup from schema {v}"),
        None => println!("restored legacy backup"),
      }
      println!(
        "{} files, {} settings, {} migration stages",
        report.files_restored,
        report.settings_applied,
        report.migration.stages.len()
      );
    }

    Command::Pref { key, value } => {
      let pref = Preference::from_key(&key)?;
      match value {
        Some(raw) => settings.set(pref, parse_value(&raw))?,
        None => match settings.get(pref) {
          Some(SettingValue::Bool(b)) => println!("{b}"),
          Some(SettingValue::Int(i)) => println!("{i}"),
          Some(SettingValue::Float(f)) => println!("{f}"),
          Some(SettingValue::Text(t)) => println!("{t}"),
          None => println!("(unset)"),
        },
      }
    }
  }
  Ok(())
}

async fn find<S>(store: &S, catalog_id: CatalogId) -> anyhow::Result<Record>
where
  S: RecordStore,
{
  store
    .get_by_catalog_id(catalog_id)
    .await?
    .with_context(|| format!("no title with catalog id {catalog_id} in the library"))
}

fn summary(r: &Record) -> String {
  let state = match r.watch_state {
    WatchState::PlanToWatch => "plan",
    WatchState::Watching => "watching",
    WatchState::Watched => "watched",
  };
  let star = if r.favorite { "*" } else { " " };
  let name = match r.kind {
    MediaKind::Season { season_number, parent_series_id } => {
      format!("{} (season {season_number} of {parent_series_id})", r.name)
    }
    _ => r.name.clone(),
  };
  format!("{star} {:>8}  {:<7} {:<8} {name}", r.catalog_id, r.kind.discriminant(), state)
}

fn display_opt(path: Option<&Path>) -> String {
  path.map_or_else(|| "(in memory)".to_owned(), |p| p.display().to_string())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}
