//! Error types for `watchlog-backup`.

use thiserror::Error;
use watchlog_core::version::SchemaVersion;

use crate::archive::ArchiveError;

/// Failure while writing a backup. Each variant names the step that failed;
/// the staging directory is gone by the time the caller sees any of them.
#[derive(Debug, Error)]
pub enum BackupError {
  #[error("could not prepare staging directory: {0}")]
  Staging(#[source] std::io::Error),

  #[error("could not write version stamp: {0}")]
  VersionStamp(String),

  #[error("could not export settings: {0}")]
  Settings(String),

  #[error("could not copy store files: {0}")]
  StoreFiles(String),

  #[error("could not compress backup: {0}")]
  Compression(#[from] ArchiveError),
}

#[derive(Debug, Error)]
pub enum RestoreError {
  #[error("could not extract backup: {0}")]
  Extraction(#[from] ArchiveError),

  /// The archive was written by a schema the running build must not accept.
  /// Nothing was changed.
  #[error("backup schema {archive} is incompatible with the running schema {live}")]
  SchemaIncompatible {
    archive: SchemaVersion,
    live:    SchemaVersion,
  },

  #[error("restore failed: {0}")]
  Failed(String),
}

pub type Result<T, E = BackupError> = std::result::Result<T, E>;
