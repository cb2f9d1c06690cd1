//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates are `YYYY-MM-DD`. The media
//! kind and the locale maps are compact JSON. UUIDs are hyphenated lowercase.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{OptionalExtension as _, Row};
use watchlog_core::record::{MediaKind, Record, WatchState};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> / NaiveDate ───────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::Decode(format!("date {s:?}: {e}")))
}

// ─── MediaKind ───────────────────────────────────────────────────────────────

pub fn encode_kind(kind: &MediaKind) -> Result<String> { Ok(serde_json::to_string(kind)?) }

pub fn decode_kind(s: &str) -> Result<MediaKind> { Ok(serde_json::from_str(s)?) }

// ─── WatchState ──────────────────────────────────────────────────────────────

pub fn encode_watch_state(state: WatchState) -> &'static str {
  match state {
    WatchState::PlanToWatch => "plan_to_watch",
    WatchState::Watching => "watching",
    WatchState::Watched => "watched",
  }
}

pub fn decode_watch_state(s: &str) -> Result<WatchState> {
  match s {
    "plan_to_watch" => Ok(WatchState::PlanToWatch),
    "watching" => Ok(WatchState::Watching),
    "watched" => Ok(WatchState::Watched),
    other => Err(watchlog_core::Error::UnknownWatchState(other.to_owned()).into()),
  }
}

// ─── Locale maps ─────────────────────────────────────────────────────────────

pub fn encode_locales(map: &BTreeMap<String, String>) -> Result<String> {
  Ok(serde_json::to_string(map)?)
}

pub fn decode_locales(s: &str) -> Result<BTreeMap<String, String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawRecord::from_row`].
pub const RECORD_COLUMNS: &str = "record_id, catalog_id, name, localized_names, overview,
  localized_overviews, release_date, kind, homepage, poster_path, backdrop_path,
  saved_at, watch_state, started_on, finished_on, favorite, notes, custom_poster,
  parent_record_id, visible";

/// Raw values read directly from a current-generation `media` row.
pub struct RawRecord {
  pub record_id:           String,
  pub catalog_id:          i64,
  pub name:                String,
  pub localized_names:     String,
  pub overview:            Option<String>,
  pub localized_overviews: String,
  pub release_date:        Option<String>,
  pub kind:                String,
  pub homepage:            Option<String>,
  pub poster_path:         Option<String>,
  pub backdrop_path:       Option<String>,
  pub saved_at:            String,
  pub watch_state:         String,
  pub started_on:          Option<String>,
  pub finished_on:         Option<String>,
  pub favorite:            bool,
  pub notes:               String,
  pub custom_poster:       bool,
  pub parent_record_id:    Option<String>,
  pub visible:             bool,
}

impl RawRecord {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:           row.get(0)?,
      catalog_id:          row.get(1)?,
      name:                row.get(2)?,
      localized_names:     row.get(3)?,
      overview:            row.get(4)?,
      localized_overviews: row.get(5)?,
      release_date:        row.get(6)?,
      kind:                row.get(7)?,
      homepage:            row.get(8)?,
      poster_path:         row.get(9)?,
      backdrop_path:       row.get(10)?,
      saved_at:            row.get(11)?,
      watch_state:         row.get(12)?,
      started_on:          row.get(13)?,
      finished_on:         row.get(14)?,
      favorite:            row.get(15)?,
      notes:               row.get(16)?,
      custom_poster:       row.get(17)?,
      parent_record_id:    row.get(18)?,
      visible:             row.get(19)?,
    })
  }

  pub fn into_record(self) -> Result<Record> {
    Ok(Record {
      record_id:           decode_uuid(&self.record_id)?,
      catalog_id:          self.catalog_id,
      name:                self.name,
      localized_names:     decode_locales(&self.localized_names)?,
      overview:            self.overview,
      localized_overviews: decode_locales(&self.localized_overviews)?,
      release_date:        self.release_date.as_deref().map(decode_date).transpose()?,
      kind:                decode_kind(&self.kind)?,
      homepage:            self.homepage,
      poster_path:         self.poster_path,
      backdrop_path:       self.backdrop_path,
      saved_at:            decode_dt(&self.saved_at)?,
      watch_state:         decode_watch_state(&self.watch_state)?,
      started_on:          self.started_on.as_deref().map(decode_date).transpose()?,
      finished_on:         self.finished_on.as_deref().map(decode_date).transpose()?,
      favorite:            self.favorite,
      notes:               self.notes,
      custom_poster:       self.custom_poster,
      parent_record_id:    self.parent_record_id.as_deref().map(decode_uuid).transpose()?,
      visible:             self.visible,
    })
  }
}

// ─── Statements ──────────────────────────────────────────────────────────────

/// Select one record by an arbitrary single-parameter predicate.
pub fn select_one(
  conn: &rusqlite::Connection,
  predicate: &str,
  param: &dyn rusqlite::ToSql,
) -> Result<Option<Record>> {
  let sql = format!("SELECT {RECORD_COLUMNS} FROM media WHERE {predicate}");
  conn
    .query_row(&sql, [param], RawRecord::from_row)
    .optional()?
    .map(RawRecord::into_record)
    .transpose()
}

/// Insert a fully-built record.
pub fn insert_record(conn: &rusqlite::Connection, record: &Record) -> Result<()> {
  let p = RecordParams::new(record)?;
  conn.execute(
    &format!(
      "INSERT INTO media ({RECORD_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
               ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)"
    ),
    rusqlite::params![
      p.record_id,
      record.catalog_id,
      record.name,
      p.localized_names,
      record.overview,
      p.localized_overviews,
      p.release_date,
      p.kind,
      record.homepage,
      record.poster_path,
      record.backdrop_path,
      p.saved_at,
      p.watch_state,
      p.started_on,
      p.finished_on,
      record.favorite,
      record.notes,
      record.custom_poster,
      p.parent_record_id,
      record.visible,
    ],
  )?;
  Ok(())
}

/// Overwrite every column of an existing record, keyed on `record_id`.
pub fn update_record(conn: &rusqlite::Connection, record: &Record) -> Result<()> {
  let p = RecordParams::new(record)?;
  conn.execute(
    "UPDATE media SET
       catalog_id = ?2, name = ?3, localized_names = ?4, overview = ?5,
       localized_overviews = ?6, release_date = ?7, kind = ?8, homepage = ?9,
       poster_path = ?10, backdrop_path = ?11, saved_at = ?12, watch_state = ?13,
       started_on = ?14, finished_on = ?15, favorite = ?16, notes = ?17,
       custom_poster = ?18, parent_record_id = ?19, visible = ?20
     WHERE record_id = ?1",
    rusqlite::params![
      p.record_id,
      record.catalog_id,
      record.name,
      p.localized_names,
      record.overview,
      p.localized_overviews,
      p.release_date,
      p.kind,
      record.homepage,
      record.poster_path,
      record.backdrop_path,
      p.saved_at,
      p.watch_state,
      p.started_on,
      p.finished_on,
      record.favorite,
      record.notes,
      record.custom_poster,
      p.parent_record_id,
      record.visible,
    ],
  )?;
  Ok(())
}

/// The encoded (non-trivial) columns of a record.
struct RecordParams {
  record_id:           String,
  localized_names:     String,
  localized_overviews: String,
  release_date:        Option<String>,
  kind:                String,
  saved_at:            String,
  watch_state:         &'static str,
  started_on:          Option<String>,
  finished_on:         Option<String>,
  parent_record_id:    Option<String>,
}

impl RecordParams {
  fn new(record: &Record) -> Result<Self> {
    Ok(Self {
      record_id:           encode_uuid(record.record_id),
      localized_names:     encode_locales(&record.localized_names)?,
      localized_overviews: encode_locales(&record.localized_overviews)?,
      release_date:        record.release_date.map(encode_date),
      kind:                encode_kind(&record.kind)?,
      saved_at:            encode_dt(record.saved_at),
      watch_state:         encode_watch_state(record.watch_state),
      started_on:          record.started_on.map(encode_date),
      finished_on:         record.finished_on.map(encode_date),
      parent_record_id:    record.parent_record_id.map(encode_uuid),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn watch_state_roundtrip() {
    for state in [WatchState::PlanToWatch, WatchState::Watching, WatchState::Watched] {
      assert_eq!(decode_watch_state(encode_watch_state(state)).unwrap(), state);
    }
    assert!(decode_watch_state("dropped").is_err());
  }

  #[test]
  fn date_format() {
    let d = NaiveDate::from_ymd_opt(2023, 9, 29).unwrap();
    assert_eq!(encode_date(d), "2023-09-29");
    assert_eq!(decode_date("2023-09-29").unwrap(), d);
    assert!(decode_date("29/09/2023").is_err());
  }
}
