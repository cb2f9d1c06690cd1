//! Error type for `watchlog-store-sqlite`.

use thiserror::Error;
use watchlog_core::{record::CatalogId, version::SchemaVersion};

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] watchlog_core::Error),

  /// Any failure reported by the store's background connection, commit
  /// failures included.
  #[error("save failed: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("i/o error: {0}")]
  Io(#[from] std::io::Error),

  #[error("decode error: {0}")]
  Decode(String),

  #[error("a record with catalog id {0} already exists")]
  DuplicateCatalogId(CatalogId),

  #[error("store is at schema {on_disk}, newer than the newest known schema {newest}")]
  StoreTooNew {
    on_disk: SchemaVersion,
    newest:  SchemaVersion,
  },

  #[error("store header carries unknown schema tag {0:#x}")]
  UnknownGeneration(u32),

  #[error("generation chain is not strictly increasing at {0}")]
  BrokenChain(SchemaVersion),

  #[error("cannot migrate record with catalog id {catalog_id}: {reason}")]
  InvalidRow {
    catalog_id: CatalogId,
    reason:     String,
  },

  #[error("store is suspended pending reload")]
  Suspended,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
