//! Owning the live store across its lifecycle: open, suspend for file
//! replacement, reload.

use std::path::{Path, PathBuf};

use tokio::sync::RwLock;
use tracing::info;
use watchlog_core::version::SchemaVersion;

use crate::{
  migrate::{MigrationPlan, MigrationReport},
  Error, Result, SqliteStore,
};

/// Where a store's files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
  /// `<dir>/<base_name>.sqlite`, plus the `-wal` / `-shm` side files SQLite
  /// keeps next to it.
  Disk { dir: PathBuf, base_name: String },
  /// Nothing on disk; reloading yields an empty store.
  Memory,
}

impl StoreLocation {
  pub const DEFAULT_BASE_NAME: &'static str = "Library";

  /// `<data dir>/watchlog/Library.sqlite`, if the platform has a data dir.
  pub fn default_disk() -> Option<Self> {
    Some(Self::Disk {
      dir:       dirs::data_dir()?.join("watchlog"),
      base_name: Self::DEFAULT_BASE_NAME.to_owned(),
    })
  }

  pub fn disk(dir: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
    Self::Disk { dir: dir.into(), base_name: base_name.into() }
  }

  pub fn storage_dir(&self) -> Option<&Path> {
    match self {
      Self::Disk { dir, .. } => Some(dir),
      Self::Memory => None,
    }
  }

  /// File-name prefix shared by the main file and its side files.
  pub fn file_prefix(&self) -> Option<String> {
    match self {
      Self::Disk { base_name, .. } => Some(format!("{base_name}.sqlite")),
      Self::Memory => None,
    }
  }

  pub fn main_file(&self) -> Option<PathBuf> {
    Some(self.storage_dir()?.join(self.file_prefix()?))
  }
}

/// The single owner of the live [`SqliteStore`].
///
/// Handles returned by [`StoreManager::store`] are clones of the live one and
/// go stale when the manager suspends or reloads; callers fetch a fresh handle
/// afterwards.
pub struct StoreManager {
  location: StoreLocation,
  live:     RwLock<Option<SqliteStore>>,
}

impl StoreManager {
  /// Open the store at `location`, creating its directory and migrating it to
  /// the newest generation.
  pub async fn open(location: StoreLocation) -> Result<Self> {
    let (store, _) = open_at(&location).await?;
    Ok(Self { location, live: RwLock::new(Some(store)) })
  }

  /// A manager over a fresh in-memory store.
  pub async fn in_memory() -> Result<Self> { Self::open(StoreLocation::Memory).await }

  pub fn location(&self) -> &StoreLocation { &self.location }

  /// The generation this build writes.
  pub fn schema_version(&self) -> SchemaVersion { MigrationPlan::current().newest() }

  /// A handle to the live store.
  pub async fn store(&self) -> Result<SqliteStore> {
    self.live.read().await.clone().ok_or(Error::Suspended)
  }

  pub async fn is_suspended(&self) -> bool { self.live.read().await.is_none() }

  /// Fold the write-ahead log into the main file.
  pub async fn checkpoint(&self) -> Result<()> { self.store().await?.checkpoint().await }

  /// Checkpoint and close the live store so its files can be replaced.
  /// Suspending an already suspended manager does nothing.
  pub async fn suspend(&self) -> Result<()> {
    let Some(store) = self.live.write().await.take() else {
      return Ok(());
    };
    store.checkpoint().await?;
    store.close().await?;
    info!(location = ?self.location, "store suspended");
    Ok(())
  }

  /// Close the live store (if any) and reopen it from the same location,
  /// migrating whatever is now on disk.
  pub async fn reload(&self) -> Result<MigrationReport> {
    let mut live = self.live.write().await;
    if let Some(store) = live.take() {
      store.close().await?;
    }
    let (store, report) = open_at(&self.location).await?;
    *live = Some(store);
    info!(location = ?self.location, from = ?report.from, to = %report.to, "store reloaded");
    Ok(report)
  }
}

async fn open_at(location: &StoreLocation) -> Result<(SqliteStore, MigrationReport)> {
  match location {
    StoreLocation::Disk { dir, base_name } => {
      tokio::fs::create_dir_all(dir).await?;
      SqliteStore::open_with_report(dir.join(format!("{base_name}.sqlite"))).await
    }
    StoreLocation::Memory => SqliteStore::open_in_memory_with_report().await,
  }
}
