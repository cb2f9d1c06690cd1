//! Writing backup archives.

use std::{
  collections::BTreeMap,
  fs,
  path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use watchlog_core::{
  settings::{Preference, SettingValue, SettingsStore},
  version::SchemaVersion,
};
use watchlog_store_sqlite::StoreManager;

use crate::{
  archive, files,
  error::{BackupError, Result},
  ARCHIVE_EXTENSION, ROOT_FOLDER, SETTINGS_FILE, VERSION_FILE,
};

/// `Watchlog-20240301-093000.watchlogbackup`
pub fn archive_name(at: DateTime<Utc>) -> String {
  format!("Watchlog-{}.{ARCHIVE_EXTENSION}", at.format("%Y%m%d-%H%M%S"))
}

/// Package the live store, its schema version and the allow-listed settings
/// into a new archive in `out_dir`. Returns the archive path.
///
/// An archive already at that path is replaced. Nothing is left behind on
/// failure.
pub async fn create_backup(
  manager: &StoreManager,
  settings: &dyn SettingsStore,
  out_dir: &Path,
) -> Result<PathBuf> {
  let location = manager.location();
  let (Some(store_dir), Some(prefix)) = (location.storage_dir(), location.file_prefix()) else {
    return Err(BackupError::StoreFiles("an in-memory store has no files to back up".into()));
  };

  manager
    .checkpoint()
    .await
    .map_err(|e| BackupError::StoreFiles(format!("checkpoint: {e}")))?;

  let job = Job {
    version:   manager.schema_version(),
    settings:  settings.snapshot(Preference::BACKED_UP),
    store_dir: store_dir.to_path_buf(),
    prefix,
    target:    out_dir.join(archive_name(Utc::now())),
  };

  tokio::task::spawn_blocking(move || job.run())
    .await
    .map_err(|e| BackupError::Staging(std::io::Error::other(e)))?
}

/// Everything the blocking half of a backup needs, owned.
struct Job {
  version:   SchemaVersion,
  settings:  BTreeMap<String, SettingValue>,
  store_dir: PathBuf,
  prefix:    String,
  target:    PathBuf,
}

impl Job {
  fn run(self) -> Result<PathBuf> {
    let staging = tempfile::Builder::new()
      .prefix("watchlog-backup-")
      .tempdir()
      .map_err(BackupError::Staging)?;
    let root = staging.path().join(ROOT_FOLDER);
    fs::create_dir(&root).map_err(BackupError::Staging)?;

    let stamp = serde_json::to_vec_pretty(&self.version)
      .map_err(|e| BackupError::VersionStamp(e.to_string()))?;
    fs::write(root.join(VERSION_FILE), stamp)
      .map_err(|e| BackupError::VersionStamp(e.to_string()))?;

    let snapshot = serde_json::to_vec_pretty(&self.settings)
      .map_err(|e| BackupError::Settings(e.to_string()))?;
    fs::write(root.join(SETTINGS_FILE), snapshot)
      .map_err(|e| BackupError::Settings(e.to_string()))?;

    let store_files = files::matching(&self.store_dir, &self.prefix)
      .map_err(|e| BackupError::StoreFiles(e.to_string()))?;
    if store_files.is_empty() {
      return Err(BackupError::StoreFiles(format!(
        "no files named {}* in {}",
        self.prefix,
        self.store_dir.display()
      )));
    }
    files::copy_into(&store_files, &root).map_err(|e| BackupError::StoreFiles(e.to_string()))?;

    if let Some(parent) = self.target.parent() {
      fs::create_dir_all(parent).map_err(archive::ArchiveError::from)?;
    }
    if self.target.exists() {
      fs::remove_file(&self.target).map_err(archive::ArchiveError::from)?;
    }
    let packed = match archive::pack(&root, &self.target) {
      Ok(n) => n,
      Err(e) => {
        if self.target.exists() {
          if let Err(cleanup) = fs::remove_file(&self.target) {
            warn!(path = %self.target.display(), error = %cleanup, "could not remove partial archive");
          }
        }
        return Err(e.into());
      }
    };

    info!(
      path = %self.target.display(),
      version = %self.version,
      settings = self.settings.len(),
      files = packed,
      "backup created"
    );
    Ok(self.target)
  }
}
