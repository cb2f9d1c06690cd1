//! Generation 1.0.0 — the original flat schema.
//!
//! The media kind is spread over three columns (`kind` text plus two integers
//! that only seasons use) and watch progress is a pair of booleans.

use rusqlite::{Connection, ToSql};
use watchlog_core::version::SchemaVersion;

use super::{placeholders, Common, COMMON_COLUMNS, COMMON_WIDTH};

pub const VERSION: SchemaVersion = SchemaVersion::new(1, 0, 0);

pub const DDL: &str = "
CREATE TABLE IF NOT EXISTS media (
    record_id        TEXT PRIMARY KEY,
    catalog_id       INTEGER NOT NULL UNIQUE,
    name             TEXT NOT NULL,
    overview         TEXT,
    release_date     TEXT,               -- YYYY-MM-DD
    homepage         TEXT,
    poster_path      TEXT,
    backdrop_path    TEXT,
    saved_at         TEXT NOT NULL,      -- RFC 3339 UTC
    favorite         INTEGER NOT NULL DEFAULT 0,
    notes            TEXT NOT NULL DEFAULT '',
    kind             TEXT NOT NULL,      -- 'movie' | 'series' | 'season'
    season_number    INTEGER,            -- seasons only
    parent_series_id INTEGER,            -- seasons only; catalog id of the series
    watched          INTEGER NOT NULL DEFAULT 0,
    watching         INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS media_saved_idx ON media(saved_at);
";

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
  pub common:           Common,
  pub kind:             String,
  pub season_number:    Option<i64>,
  pub parent_series_id: Option<i64>,
  pub watched:          bool,
  pub watching:         bool,
}

impl Row {
  pub fn new(common: Common, kind: &str) -> Self {
    Self {
      common,
      kind: kind.to_owned(),
      season_number: None,
      parent_series_id: None,
      watched: false,
      watching: false,
    }
  }
}

pub fn read_all(conn: &Connection) -> rusqlite::Result<Vec<Row>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {COMMON_COLUMNS}, kind, season_number, parent_series_id, watched, watching
     FROM media ORDER BY saved_at, rowid"
  ))?;
  let rows = stmt
    .query_map([], |row| {
      Ok(Row {
        common:           Common::from_row(row)?,
        kind:             row.get(COMMON_WIDTH)?,
        season_number:    row.get(COMMON_WIDTH + 1)?,
        parent_series_id: row.get(COMMON_WIDTH + 2)?,
        watched:          row.get(COMMON_WIDTH + 3)?,
        watching:         row.get(COMMON_WIDTH + 4)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

pub fn insert(conn: &Connection, row: &Row) -> rusqlite::Result<()> {
  let mut params: Vec<&dyn ToSql> = row.common.params().to_vec();
  params.extend([
    &row.kind as &dyn ToSql,
    &row.season_number,
    &row.parent_series_id,
    &row.watched,
    &row.watching,
  ]);
  conn.execute(
    &format!(
      "INSERT INTO media ({COMMON_COLUMNS}, kind, season_number, parent_series_id, watched, watching)
       VALUES ({})",
      placeholders(params.len())
    ),
    rusqlite::params_from_iter(params),
  )?;
  Ok(())
}
