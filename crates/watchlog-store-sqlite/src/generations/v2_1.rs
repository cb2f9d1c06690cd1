//! Generation 2.1.0: a single watch state.
//!
//! The `watched` / `watching` booleans are replaced by one `watch_state`
//! column. Dates are normalised on the way so every migrated record is
//! consistent with its state; a missing date falls back to the day the record
//! was saved.

use chrono::NaiveDate;
use rusqlite::{Connection, ToSql};
use watchlog_core::{
  record::{MediaKind, WatchState},
  version::SchemaVersion,
};

use super::{has_column, placeholders, v2_0, Common, COMMON_COLUMNS, COMMON_WIDTH, MEDIA};
use crate::{
  encode::{decode_dt, decode_kind, decode_watch_state, encode_date, encode_kind, encode_watch_state},
  migrate::{run_custom, CustomMigration, CustomStage, StageKind},
  Result,
};

pub const VERSION: SchemaVersion = SchemaVersion::new(2, 1, 0);

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
    kind             TEXT NOT NULL,
    watch_state      TEXT NOT NULL DEFAULT 'plan_to_watch',
    started_on       TEXT,
    finished_on      TEXT,
    custom_poster    INTEGER NOT NULL DEFAULT 0,
    parent_record_id TEXT,
    visible          INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS media_saved_idx ON media(saved_at);
";

pub const STAGE: StageKind = StageKind::Custom(CustomStage {
  description: "replace watched/watching flags with a watch state",
  run:         run_custom::<WatchStateMigration>,
});

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
  pub common:           Common,
  pub kind:             MediaKind,
  pub watch_state:      WatchState,
  pub started_on:       Option<String>,
  pub finished_on:      Option<String>,
  pub custom_poster:    bool,
  pub parent_record_id: Option<String>,
  pub visible:          bool,
}

const COLUMNS: &str =
  "kind, watch_state, started_on, finished_on, custom_poster, parent_record_id, visible";

pub fn read_all(conn: &Connection) -> Result<Vec<Row>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {COMMON_COLUMNS}, {COLUMNS} FROM media ORDER BY saved_at, rowid"
  ))?;
  let raw = stmt
    .query_map([], |row| {
      Ok((
        Common::from_row(row)?,
        row.get::<_, String>(COMMON_WIDTH)?,
        row.get::<_, String>(COMMON_WIDTH + 1)?,
        row.get(COMMON_WIDTH + 2)?,
        row.get(COMMON_WIDTH + 3)?,
        row.get(COMMON_WIDTH + 4)?,
        row.get(COMMON_WIDTH + 5)?,
        row.get(COMMON_WIDTH + 6)?,
      ))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  raw
    .into_iter()
    .map(|(common, kind, state, started_on, finished_on, custom_poster, parent, visible)| {
      Ok(Row {
        common,
        kind: decode_kind(&kind)?,
        watch_state: decode_watch_state(&state)?,
        started_on,
        finished_on,
        custom_poster,
        parent_record_id: parent,
        visible,
      })
    })
    .collect()
}

pub fn insert(conn: &Connection, row: &Row) -> Result<()> { write(conn, row, "INSERT") }

/// Insert, replacing any row with the same catalog ID or record ID.
pub fn upsert(conn: &Connection, row: &Row) -> Result<()> {
  write(conn, row, "INSERT OR REPLACE")
}

fn write(conn: &Connection, row: &Row, verb: &str) -> Result<()> {
  let kind = encode_kind(&row.kind)?;
  let state = encode_watch_state(row.watch_state);
  let mut params: Vec<&dyn ToSql> = row.common.params().to_vec();
  params.extend([
    &kind as &dyn ToSql,
    &state,
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

/// Watch state plus normalised `(started_on, finished_on)` for one 2.0 row.
///
/// `watched` wins over `watching` when both are set. `saved_on` stands in for
/// any date the state requires but the row lacks.
pub fn fold_watch_flags(
  watched: bool,
  watching: bool,
  started_on: Option<String>,
  finished_on: Option<String>,
  saved_on: NaiveDate,
) -> (WatchState, Option<String>, Option<String>) {
  let fallback = || encode_date(saved_on);
  if watched {
    let finished = finished_on.unwrap_or_else(fallback);
    let started = started_on.unwrap_or_else(|| finished.clone());
    (WatchState::Watched, Some(started), Some(finished))
  } else if watching {
    (WatchState::Watching, Some(started_on.unwrap_or_else(fallback)), None)
  } else {
    (WatchState::PlanToWatch, started_on, finished_on)
  }
}

pub struct WatchStateMigration;

impl CustomMigration for WatchStateMigration {
  type Target = Row;

  fn will_migrate(conn: &Connection) -> Result<Vec<Row>> {
    if !has_column(conn, MEDIA, "watched")? {
      return Ok(Vec::new());
    }

    let mut targets = Vec::new();
    for row in v2_0::read_all(conn)? {
      let saved_on = decode_dt(&row.common.saved_at)?.date_naive();
      let (watch_state, started_on, finished_on) = fold_watch_flags(
        row.watched,
        row.watching,
        row.started_on,
        row.finished_on,
        saved_on,
      );
      targets.push(Row {
        common: row.common,
        kind: row.kind,
        watch_state,
        started_on,
        finished_on,
        custom_poster: row.custom_poster,
        parent_record_id: row.parent_record_id,
        visible: row.visible,
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
