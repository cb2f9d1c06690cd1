//! Generation 1.1.0: watch dates and the custom-poster flag.
//!
//! Reached from 1.0.0 by a lightweight stage; existing rows get no dates and
//! `custom_poster = 0`.

use rusqlite::{Connection, ToSql};
use watchlog_core::version::SchemaVersion;

use super::{placeholders, v1_0, Common, COMMON_COLUMNS, COMMON_WIDTH};

pub const VERSION: SchemaVersion = SchemaVersion::new(1, 1, 0);

pub const UPGRADE_DDL: &str = "
ALTER TABLE media ADD COLUMN started_on    TEXT;
ALTER TABLE media ADD COLUMN finished_on   TEXT;
ALTER TABLE media ADD COLUMN custom_poster INTEGER NOT NULL DEFAULT 0;
";

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
  pub common:           Common,
  pub kind:             String,
  pub season_number:    Option<i64>,
  pub parent_series_id: Option<i64>,
  pub watched:          bool,
  pub watching:         bool,
  pub started_on:       Option<String>,
  pub finished_on:      Option<String>,
  pub custom_poster:    bool,
}

impl From<v1_0::Row> for Row {
  fn from(row: v1_0::Row) -> Self {
    Self {
      common:           row.common,
      kind:             row.kind,
      season_number:    row.season_number,
      parent_series_id: row.parent_series_id,
      watched:          row.watched,
      watching:         row.watching,
      started_on:       None,
      finished_on:      None,
      custom_poster:    false,
    }
  }
}

pub fn read_all(conn: &Connection) -> rusqlite::Result<Vec<Row>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {COMMON_COLUMNS}, kind, season_number, parent_series_id, watched, watching,
            started_on, finished_on, custom_poster
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
        started_on:       row.get(COMMON_WIDTH + 5)?,
        finished_on:      row.get(COMMON_WIDTH + 6)?,
        custom_poster:    row.get(COMMON_WIDTH + 7)?,
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
    &row.started_on,
    &row.finished_on,
    &row.custom_poster,
  ]);
  conn.execute(
    &format!(
      "INSERT INTO media ({COMMON_COLUMNS}, kind, season_number, parent_series_id, watched,
                          watching, started_on, finished_on, custom_poster)
       VALUES ({})",
      placeholders(params.len())
    ),
    rusqlite::params_from_iter(params),
  )?;
  Ok(())
}
