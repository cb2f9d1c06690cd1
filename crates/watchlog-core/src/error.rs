//! Error types for `watchlog-core`.

use thiserror::Error;

use crate::version::SchemaVersion;

#[derive(Debug, Error)]
pub enum Error {
  #[error("malformed schema version: {0:?}")]
  MalformedVersion(String),

  #[error("schema version {0} cannot be packed into a store header")]
  UnpackableVersion(SchemaVersion),

  #[error("unknown watch state: {0:?}")]
  UnknownWatchState(String),

  #[error("unknown preference key: {0:?}")]
  UnknownPreference(String),

  #[error("settings store error: {0}")]
  Settings(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
