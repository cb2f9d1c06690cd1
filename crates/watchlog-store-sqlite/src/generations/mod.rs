//! Record schema generations.
//!
//! [`GENERATIONS`] is the flat, ordered registry of every schema the store
//! has ever shipped with: one entry per release, oldest first, each carrying
//! the stage that upgrades a store from the previous entry. Historical
//! generations keep a typed row struct with `read_all` / `insert` so custom
//! stages (and tests seeding old stores) can work with them directly; the
//! current generation is read and written by [`crate::SqliteStore`].
//!
//! | Version | Stage from previous | Change |
//! |---------|---------------------|--------|
//! | 1.0.0 | — | initial flat schema |
//! | 1.1.0 | lightweight | watch dates, custom-poster flag |
//! | 2.0.0 | custom | flat kind → tagged [`MediaKind`], parent link, visibility |
//! | 2.1.0 | custom | watched/watching pair → [`WatchState`] |
//! | 2.2.0 | lightweight | localized names and overviews |
//!
//! [`MediaKind`]: watchlog_core::record::MediaKind
//! [`WatchState`]: watchlog_core::record::WatchState

pub mod v1_0;
pub mod v1_1;
pub mod v2_0;
pub mod v2_1;
pub mod v2_2;

use rusqlite::{Connection, Row, ToSql};
use watchlog_core::version::SchemaVersion;

use crate::migrate::{Generation, StageKind};

/// The one record type every generation so far defines.
pub const MEDIA: &str = "media";

/// Every generation, oldest first.
pub static GENERATIONS: &[Generation] = &[
  Generation {
    version:      v1_0::VERSION,
    record_types: &[MEDIA],
    upgrade:      None,
  },
  Generation {
    version:      v1_1::VERSION,
    record_types: &[MEDIA],
    upgrade:      Some(StageKind::Lightweight { ddl: v1_1::UPGRADE_DDL }),
  },
  Generation {
    version:      v2_0::VERSION,
    record_types: &[MEDIA],
    upgrade:      Some(v2_0::STAGE),
  },
  Generation {
    version:      v2_1::VERSION,
    record_types: &[MEDIA],
    upgrade:      Some(v2_1::STAGE),
  },
  Generation {
    version:      v2_2::VERSION,
    record_types: &[MEDIA],
    upgrade:      Some(StageKind::Lightweight { ddl: v2_2::UPGRADE_DDL }),
  },
];

/// The newest generation this build understands.
pub const CURRENT: SchemaVersion = v2_2::VERSION;

// ─── Shared columns ──────────────────────────────────────────────────────────

/// Columns whose meaning and encoding never changed across generations.
/// Migrations copy them verbatim.
pub const COMMON_COLUMNS: &str = "record_id, catalog_id, name, overview, release_date,
  homepage, poster_path, backdrop_path, saved_at, favorite, notes";

/// Number of columns in [`COMMON_COLUMNS`]; generation-specific columns start
/// at this index in a `SELECT COMMON_COLUMNS, ...`.
pub const COMMON_WIDTH: usize = 11;

/// Raw values of [`COMMON_COLUMNS`], kept exactly as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Common {
  pub record_id:     String,
  pub catalog_id:    i64,
  pub name:          String,
  pub overview:      Option<String>,
  pub release_date:  Option<String>,
  pub homepage:      Option<String>,
  pub poster_path:   Option<String>,
  pub backdrop_path: Option<String>,
  pub saved_at:      String,
  pub favorite:      bool,
  pub notes:         String,
}

impl Common {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:     row.get(0)?,
      catalog_id:    row.get(1)?,
      name:          row.get(2)?,
      overview:      row.get(3)?,
      release_date:  row.get(4)?,
      homepage:      row.get(5)?,
      poster_path:   row.get(6)?,
      backdrop_path: row.get(7)?,
      saved_at:      row.get(8)?,
      favorite:      row.get(9)?,
      notes:         row.get(10)?,
    })
  }

  /// Positional parameters in [`COMMON_COLUMNS`] order.
  pub fn params(&self) -> [&dyn ToSql; COMMON_WIDTH] {
    [
      &self.record_id,
      &self.catalog_id,
      &self.name,
      &self.overview,
      &self.release_date,
      &self.homepage,
      &self.poster_path,
      &self.backdrop_path,
      &self.saved_at,
      &self.favorite,
      &self.notes,
    ]
  }

  /// A minimal row for seeding and tests.
  pub fn new(catalog_id: i64, name: &str, saved_at: &str) -> Self {
    Self {
      record_id:     crate::encode::encode_uuid(uuid::Uuid::new_v4()),
      catalog_id,
      name:          name.to_owned(),
      overview:      None,
      release_date:  None,
      homepage:      None,
      poster_path:   None,
      backdrop_path: None,
      saved_at:      saved_at.to_owned(),
      favorite:      false,
      notes:         String::new(),
    }
  }
}

/// `?, ?, …` with `n` placeholders.
pub fn placeholders(n: usize) -> String { vec!["?"; n].join(", ") }

// ─── Introspection helpers ───────────────────────────────────────────────────

pub fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
  conn.query_row(
    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
    [table],
    |row| row.get(0),
  )
}

pub fn has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
  let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
  let names = stmt
    .query_map([], |row| row.get::<_, String>(1))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(names.iter().any(|n| n == column))
}
