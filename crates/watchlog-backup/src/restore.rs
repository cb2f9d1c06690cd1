//! Restoring a backup archive over the live store.
//!
//! The sequence is: extract, find the root folder, gate on the version stamp,
//! check the archived store file itself, apply settings, suspend the store,
//! move its files aside and copy the archived ones in, clean up, reload.
//! Nothing outside the staging directory is touched until both checks have
//! passed. If the copy or the reload fails, the set-aside files are put back
//! and reopened. Settings are not rolled back.

use std::{
  collections::BTreeMap,
  fs,
  path::{Path, PathBuf},
};

use tracing::{info, warn};
use watchlog_core::{
  settings::{Preference, SettingValue, SettingsStore},
  version::SchemaVersion,
};
use watchlog_store_sqlite::{MigrationPlan, MigrationReport, StoreManager};

use crate::{
  archive,
  error::RestoreError,
  files::{self, SetAside},
  ROOT_FOLDER, SETTINGS_FILE, VERSION_FILE,
};

type Result<T, E = RestoreError> = std::result::Result<T, E>;

// ─── Options and report ──────────────────────────────────────────────────────

/// Which stamped archive versions a restore accepts. Unstamped archives are
/// always accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VersionPolicy {
  /// Only archives from an older generation than the running one.
  StrictlyOlder,
  /// Archives from an older or the same generation.
  #[default]
  NotNewer,
}

impl VersionPolicy {
  pub fn admits(self, archive: SchemaVersion, live: SchemaVersion) -> bool {
    match self {
      Self::StrictlyOlder => archive < live,
      Self::NotNewer => archive <= live,
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct RestoreOptions {
  pub version_policy: VersionPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
  /// `None` for a legacy, unstamped archive.
  pub archive_version:     Option<SchemaVersion>,
  pub settings_applied:    usize,
  pub files_restored:      usize,
  /// What reopening the restored store did to its schema.
  pub migration:           MigrationReport,
  /// Long-lived state elsewhere in the host (caches, open views) predates the
  /// restore and should be rebuilt.
  pub restart_recommended: bool,
}

// ─── Restore ─────────────────────────────────────────────────────────────────

/// Replace the live store and allow-listed settings with the contents of
/// `archive`.
pub async fn restore(
  manager: &StoreManager,
  settings: &dyn SettingsStore,
  archive: &Path,
  options: &RestoreOptions,
) -> Result<RestoreReport> {
  let location = manager.location();
  let (Some(store_dir), Some(prefix)) = (location.storage_dir(), location.file_prefix()) else {
    return Err(RestoreError::Failed("cannot restore into an in-memory store".into()));
  };

  // 1. extract
  let staging = tempfile::Builder::new()
    .prefix("watchlog-restore-")
    .tempdir()
    .map_err(|e| RestoreError::Extraction(e.into()))?;
  let extracted = {
    let archive = archive.to_path_buf();
    let dest = staging.path().to_path_buf();
    tokio::task::spawn_blocking(move || archive::unpack(&archive, &dest))
      .await
      .map_err(|e| RestoreError::Extraction(std::io::Error::other(e).into()))??
  };
  info!(archive = %archive.display(), entries = extracted, "backup extracted");

  // 2. locate root
  let root = locate_root(staging.path())?;

  // 3. version gate
  let live = manager.schema_version();
  let archive_version = read_stamp(&root)?;
  match archive_version {
    Some(version) if !options.version_policy.admits(version, live) => {
      warn!(archive = %version, %live, policy = ?options.version_policy, "backup rejected");
      return Err(RestoreError::SchemaIncompatible { archive: version, live });
    }
    Some(version) => info!(archive = %version, %live, "backup version accepted"),
    None => info!("backup has no version stamp; treating as legacy"),
  }

  // 4. archived store file
  let main_file = root.join(&prefix);
  if !main_file.is_file() {
    return Err(RestoreError::Failed(format!("backup holds no store file named {prefix}")));
  }
  check_archived_store(&main_file, live)?;
  // Listed after the check, which may fold a journal into the main file.
  let archived = files::matching(&root, &prefix).or_failed("list archived store files")?;

  // 5. settings
  let settings_applied = apply_settings(&root, settings)?;

  // 6. swap store files
  manager.suspend().await.or_failed("suspend store")?;
  let aside = match SetAside::new(store_dir, &prefix) {
    Ok(aside) => aside,
    Err(e) => {
      if let Err(reload) = manager.reload().await {
        warn!(error = %reload, "could not reopen store after failed restore");
      }
      return Err(RestoreError::Failed(format!("move live store files aside: {e}")));
    }
  };
  if let Err(e) = files::copy_into(&archived, store_dir) {
    return Err(put_back(manager, aside, format!("copy restored store files: {e}")).await);
  }
  info!(
    set_aside = aside.len(),
    restored = archived.len(),
    dir = %store_dir.display(),
    "store files replaced"
  );

  // 7. cleanup
  if let Err(e) = staging.close() {
    warn!(error = %e, "could not remove restore staging directory");
  }

  // 8. reload
  let migration = match manager.reload().await {
    Ok(migration) => migration,
    Err(e) => return Err(put_back(manager, aside, format!("reopen restored store: {e}")).await),
  };
  if let Err(e) = aside.discard() {
    warn!(error = %e, "could not remove replaced store files");
  }

  let report = RestoreReport {
    archive_version,
    settings_applied,
    files_restored: archived.len(),
    migration,
    restart_recommended: true,
  };
  info!(
    version = ?report.archive_version,
    settings = report.settings_applied,
    files = report.files_restored,
    "backup restored"
  );
  Ok(report)
}

/// Tag an error with the restore step it came from.
trait OrFailed<T> {
  fn or_failed(self, step: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> OrFailed<T> for std::result::Result<T, E> {
  fn or_failed(self, step: &str) -> Result<T> {
    self.map_err(|e| RestoreError::Failed(format!("{step}: {e}")))
  }
}

/// The archive's root folder: [`ROOT_FOLDER`] when present, otherwise the
/// only directory at the top of the archive.
fn locate_root(staging: &Path) -> Result<PathBuf> {
  let named = staging.join(ROOT_FOLDER);
  if named.is_dir() {
    return Ok(named);
  }

  let mut dirs = Vec::new();
  for entry in fs::read_dir(staging).or_failed("read extracted backup")? {
    let entry = entry.or_failed("read extracted backup")?;
    if entry.path().is_dir() {
      dirs.push(entry.path());
    }
  }
  match <[PathBuf; 1]>::try_from(dirs) {
    Ok([root]) => Ok(root),
    Err(dirs) => Err(RestoreError::Failed(format!(
      "expected one root folder in backup, found {}",
      dirs.len()
    ))),
  }
}

fn read_stamp(root: &Path) -> Result<Option<SchemaVersion>> {
  let path = root.join(VERSION_FILE);
  if !path.exists() {
    return Ok(None);
  }
  let bytes = fs::read(&path).or_failed("read version stamp")?;
  let version: SchemaVersion = serde_json::from_slice(&bytes).or_failed("decode version stamp")?;
  Ok(Some(version))
}

/// Apply every allow-listed setting in the archive. Unknown or excluded keys
/// are skipped.
fn apply_settings(root: &Path, settings: &dyn SettingsStore) -> Result<usize> {
  let path = root.join(SETTINGS_FILE);
  if !path.exists() {
    return Ok(0);
  }
  let bytes = fs::read(&path).or_failed("read settings")?;
  let values: BTreeMap<String, SettingValue> =
    serde_json::from_slice(&bytes).or_failed("decode settings")?;

  let mut applied = 0;
  for (key, value) in values {
    match Preference::from_key(&key) {
      Ok(pref) if pref.is_backed_up() => {
        settings.set(pref, value).or_failed("apply setting")?;
        applied += 1;
      }
      _ => warn!(key = %key, "skipping setting not restorable from backup"),
    }
  }
  Ok(applied)
}

/// Open the archived main store file and refuse it unless the running build
/// can migrate it. The stamp alone is not enough: legacy archives have none.
fn check_archived_store(main_file: &Path, live: SchemaVersion) -> Result<()> {
  match MigrationPlan::current().check_file(main_file) {
    Ok(on_disk) => {
      info!(on_disk = ?on_disk, "archived store readable");
      Ok(())
    }
    Err(watchlog_store_sqlite::Error::StoreTooNew { on_disk, .. }) => {
      warn!(archive = %on_disk, %live, "archived store is newer than this build");
      Err(RestoreError::SchemaIncompatible { archive: on_disk, live })
    }
    Err(e) => Err(RestoreError::Failed(format!("archived store cannot be opened: {e}"))),
  }
}

/// Undo a half-finished swap: drop whatever was copied in, move the original
/// files back and reopen them. Returns the error to report for the restore.
async fn put_back(manager: &StoreManager, aside: SetAside, reason: String) -> RestoreError {
  warn!(reason = %reason, "restore failed; putting the previous store back");
  if let Err(e) = manager.suspend().await {
    warn!(error = %e, "could not suspend store before putting files back");
  }
  if let Err(e) = aside.restore() {
    warn!(error = %e, "could not put previous store files back");
  }
  if let Err(e) = manager.reload().await {
    warn!(error = %e, "could not reopen previous store");
  }
  RestoreError::Failed(reason)
}
