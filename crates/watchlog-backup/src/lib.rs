//! Backup and restore for a Watchlog library.
//!
//! A backup is a zip archive (`.watchlogbackup`) holding one root folder:
//!
//! ```text
//! WatchlogBackup/
//!   SchemaVersion.json     {"major":2,"minor":2,"patch":0}
//!   UserSettings.json      allow-listed preferences only
//!   Library.sqlite         every store file sharing the store's prefix
//!   Library.sqlite-wal
//!   Library.sqlite-shm
//! ```
//!
//! [`create_backup`] writes one; [`restore`] gates it on its schema version and
//! swaps it in under a suspended [`StoreManager`](watchlog_store_sqlite::StoreManager).

mod archive;
mod files;

pub mod error;
pub mod export;
pub mod restore;

pub use archive::ArchiveError;
pub use error::{BackupError, RestoreError};
pub use export::create_backup;
pub use restore::{restore, RestoreOptions, RestoreReport, VersionPolicy};

/// File extension of backup archives, without the dot.
pub const ARCHIVE_EXTENSION: &str = "watchlogbackup";

/// The single folder at the root of every archive.
pub const ROOT_FOLDER: &str = "WatchlogBackup";

/// Version stamp; absent in archives written before stamping existed.
pub const VERSION_FILE: &str = "SchemaVersion.json";

pub const SETTINGS_FILE: &str = "UserSettings.json";
