//! Generation 2.0.0: the tagged media kind.
//!
//! The flat `kind` / `season_number` / `parent_series_id` triple becomes one
//! JSON column holding a [`MediaKind`]. Seasons also gain a direct link to
//! their series record (`parent_record_id`), and every record gains a
//! `visible` flag so placeholder series can be hidden from the library.

use std::collections::HashMap;

use rusqlite::{Connection, ToSql};
use watchlog_core::{record::MediaKind, version::SchemaVersion};

use super::{has_column, placeholders, v1_1, Common, COMMON_COLUMNS, COMMON_WIDTH, MEDIA};
use crate::{
  encode::{decode_kind, encode_kind},
  migrate::{run_custom, CustomMigration, CustomStage, StageKind},
  Error, Result,
};

pub const VERSION: SchemaVersion = SchemaVersion::new(2, 0, 0);

pub const DDL: &str = "
CREATE TABLE IF NOT EXISTS media (
    record_id        TEXT PRIMARY KEY,
    catalog_id       INTEGER NOT NULL UNIQUE,
    name             TEXT NOT NULL,
    overview         TEXT,
    release_date     TEXT,
    homepage         TEXT,
    poster_path      TEXT,
    backdrop_path    TEXT,
    saved_at         TEXT NOT NULL,
    favorite         INTEGER NOT NULL DEFAULT 0,
    notes            TEXT NOT NULL DEFAULT '',
    kind             TEXT NOT NULL,      -- JSON MediaKind
    watched          INTEGER NOT NULL DEFAULT 0,
    watching         INTEGER NOT NULL DEFAULT 0,
    started_on       TEXT,
    finished_on      TEXT,
    custom_poster    INTEGER NOT NULL DEFAULT 0,
    parent_record_id TEXT,               -- record_id of the parent series
    visible          INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS media_saved_idx ON media(saved_at);
";

pub const STAGE: StageKind = StageKind::Custom(CustomStage {
  description: "fold flat kind columns into a tagged media kind",
  run:         run_custom::<SeasonKindMigration>,
});

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
  pub common:           Common,
  pub kind:             MediaKind,
  pub watched:          bool,
  pub watching:         bool,
  pub started_on:       Option<String>,
  pub finished_on:      Option<String>,
  pub custom_poster:    bool,
  pub parent_record_id: Option<String>,
  pub visible:          bool,
}

const COLUMNS: &str =
  "kind, watched, watching, started_on, finished_on, custom_poster, parent_record_id, visible";

pub fn read_all(conn: &Connection) -> Result<Vec<Row>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {COMMON_COLUMNS}, {COLUMNS} FROM media ORDER BY saved_at, rowid"
  ))?;
  let raw = stmt
    .query_map([], |row| {
      Ok((
        Common::from_row(row)?,
        row.get::<_, String>(COMMON_WIDTH)?,
        row.get(COMMON_WIDTH + 1)?,
        row.get(COMMON_WIDTH + 2)?,
        row.get(COMMON_WIDTH + 3)?,
        row.get(COMMON_WIDTH + 4)?,
        row.get(COMMON_WIDTH + 5)?,
        row.get(COMMON_WIDTH + 6)?,
        row.get(COMMON_WIDTH + 7)?,
      ))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  raw
    .into_iter()
    .map(
      |(common, kind, watched, watching, started_on, finished_on, custom_poster, parent, visible)| {
        Ok(Row {
          common,
          kind: decode_kind(&kind)?,
          watched,
          watching,
          started_on,
          finished_on,
          custom_poster,
          parent_record_id: parent,
          visible,
        })
      },
    )
    .collect()
}

pub fn insert(conn: &Connection, row: &Row) -> Result<()> { write(conn, row, "INSERT") }

/// Insert, replacing any row with the same catalog ID or record ID.
pub fn upsert(conn: &Connection, row: &Row) -> Result<()> {
  write(conn, row, "INSERT OR REPLACE")
}

fn write(conn: &Connection, row: &Row, verb: &str) -> Result<()> {
  let kind = encode_kind(&row.kind)?;
  let mut params: Vec<&dyn ToSql> = row.common.params().to_vec();
  params.extend([
    &kind as &dyn ToSql,
    &row.watched,
    &row.watching,
    &row.started_on,
    &row.finished_on,
    &row.custom_poster,
    &row.parent_record_id,
    &row.visible,
  ]);
  conn.execute(
    &format!(
      "{verb} INTO media ({COMMON_COLUMNS}, {COLUMNS}) VALUES ({})",
      placeholders(params.len())
    ),
    rusqlite::params_from_iter(params),
  )?;
  Ok(())
}

// ─── Stage ───────────────────────────────────────────────────────────────────

/// Map the flat 1.x kind columns of one row to a [`MediaKind`].
pub fn flat_kind(row: &v1_1::Row) -> Result<MediaKind> {
  let invalid = |reason: String| Error::InvalidRow {
    catalog_id: row.common.catalog_id,
    reason,
  };
  match row.kind.as_str() {
    "movie" => Ok(MediaKind::Movie),
    "series" => Ok(MediaKind::Series),
    "season" => {
      let number = row
        .season_number
        .ok_or_else(|| invalid("season without a season number".into()))?;
      let season_number = u32::try_from(number)
        .map_err(|_| invalid(format!("season number {number} out of range")))?;
      let parent_series_id = row
        .parent_series_id
        .ok_or_else(|| invalid("season without a parent series".into()))?;
      Ok(MediaKind::Season { season_number, parent_series_id })
    }
    other => Err(invalid(format!("unknown media kind {other:?}"))),
  }
}

pub struct SeasonKindMigration;

impl CustomMigration for SeasonKindMigration {
  type Target = Row;

  fn will_migrate(conn: &Connection) -> Result<Vec<Row>> {
    if !has_column(conn, MEDIA, "season_number")? {
      return Ok(Vec::new());
    }

    let source = v1_1::read_all(conn)?;
    let series: HashMap<i64, String> = source
      .iter()
      .filter(|row| row.kind == "series")
      .map(|row| (row.common.catalog_id, row.common.record_id.clone()))
      .collect();

    let mut targets = Vec::with_capacity(source.len());
    for row in source {
      let kind = flat_kind(&row)?;
      let parent_record_id = kind
        .parent_series_id()
        .and_then(|id| series.get(&id).cloned());
      targets.push(Row {
        common: row.common,
        kind,
        watched: row.watched,
        watching: row.watching,
        started_on: row.started_on,
        finished_on: row.finished_on,
        custom_poster: row.custom_poster,
        parent_record_id,
        visible: true,
      });
    }

    conn.execute_batch(&format!("DROP TABLE media; {DDL}"))?;
    Ok(targets)
  }

  fn did_migrate(conn: &Connection, rows: Vec<Row>) -> Result<usize> {
    for row in &rows {
      upsert(conn, row)?;
    }
    Ok(rows.len())
  }
}
