//! [`SqliteStore`] — the SQLite implementation of [`RecordStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, warn};
use uuid::Uuid;

use watchlog_core::{
  record::{CatalogId, MediaKind, NewRecord, Record, RecordId},
  store::{RecordQuery, RecordStore},
  version::SchemaVersion,
};

use crate::{
  encode::{encode_uuid, insert_record, select_one, update_record, RawRecord, RECORD_COLUMNS},
  migrate::{MigrationPlan, MigrationReport},
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Watchlog record store backed by a single SQLite file.
///
/// Clones share one background connection. Closing any clone closes them
/// all; later calls on the others fail.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path`, migrating it to the newest schema.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Ok(Self::open_with_report(path).await?.0)
  }

  /// Like [`SqliteStore::open`], also returning what the migration did.
  pub async fn open_with_report(path: impl AsRef<Path>) -> Result<(Self, MigrationReport)> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn, true).await
  }

  /// Open an empty in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    Ok(Self::open_in_memory_with_report().await?.0)
  }

  pub async fn open_in_memory_with_report() -> Result<(Self, MigrationReport)> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn, false).await
  }

  async fn init(conn: tokio_rusqlite::Connection, wal: bool) -> Result<(Self, MigrationReport)> {
    let store = Self { conn };
    let opened = store
      .with_conn(move |conn| {
        if wal {
          conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
          })?;
        }
        MigrationPlan::current().apply(conn)
      })
      .await;
    // Release the files before reporting, so callers can move them.
    let report = match opened {
      Ok(report) => report,
      Err(e) => {
        if let Err(close) = store.close().await {
          warn!(error = %close, "could not close store after failed open");
        }
        return Err(e);
      }
    };
    if !report.is_noop() {
      debug!(from = ?report.from, to = %report.to, stages = report.stages.len(), "store schema updated");
    }
    Ok((store, report))
  }

  /// Run `f` on the connection thread, carrying crate errors back out.
  async fn with_conn<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }

  /// The generation recorded in the store header.
  pub async fn schema_version(&self) -> Result<Option<SchemaVersion>> {
    self.with_conn(|conn| MigrationPlan::on_disk_version(conn)).await
  }

  /// Fold the write-ahead log into the main file so the main file alone holds
  /// every committed write.
  pub async fn checkpoint(&self) -> Result<()> {
    self
      .with_conn(|conn| {
        conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
        Ok(())
      })
      .await
  }

  /// Close the background connection.
  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    Ok(())
  }
}

// ─── Transaction bodies ──────────────────────────────────────────────────────

fn by_id(conn: &Connection, id: RecordId) -> Result<Option<Record>> {
  select_one(conn, "record_id = ?1", &encode_uuid(id))
}

fn by_catalog_id(conn: &Connection, catalog_id: CatalogId) -> Result<Option<Record>> {
  select_one(conn, "catalog_id = ?1", &catalog_id)
}

/// The record ID of the series with `catalog_id`, creating a hidden
/// placeholder when none is stored. `None` when the catalog ID belongs to a
/// record that is not a series.
fn ensure_series(
  conn: &Connection,
  catalog_id: CatalogId,
  now: DateTime<Utc>,
) -> Result<Option<RecordId>> {
  match by_catalog_id(conn, catalog_id)? {
    Some(existing) if existing.kind == MediaKind::Series => Ok(Some(existing.record_id)),
    Some(existing) => {
      warn!(
        catalog_id,
        kind = existing.kind.discriminant(),
        "season parent is not a series; leaving season unlinked"
      );
      Ok(None)
    }
    None => {
      let mut placeholder =
        NewRecord::placeholder_series(catalog_id).into_record(Uuid::new_v4(), now);
      placeholder.visible = false;
      insert_record(conn, &placeholder)?;
      debug!(catalog_id, "created placeholder series");
      Ok(Some(placeholder.record_id))
    }
  }
}

/// Link every unlinked season of `series` to it.
fn adopt_seasons(conn: &Connection, series: &Record) -> Result<usize> {
  Ok(conn.execute(
    "UPDATE media SET parent_record_id = ?1
     WHERE parent_record_id IS NULL
       AND json_extract(kind, '$.type') = 'season'
       AND json_extract(kind, '$.parent_series_id') = ?2",
    rusqlite::params![encode_uuid(series.record_id), series.catalog_id],
  )?)
}

fn insert_tx(conn: &mut Connection, input: NewRecord, now: DateTime<Utc>) -> Result<Record> {
  let tx = conn.transaction()?;

  let record = match by_catalog_id(&tx, input.catalog_id)? {
    // A real series only known so far as a placeholder takes the placeholder
    // over, keeping its identity and the seasons linked to it.
    Some(mut placeholder) if !placeholder.visible && input.kind == MediaKind::Series => {
      placeholder.apply(input);
      placeholder.visible = true;
      update_record(&tx, &placeholder)?;
      placeholder
    }
    Some(_) => return Err(Error::DuplicateCatalogId(input.catalog_id)),
    None => {
      let mut record = input.into_record(Uuid::new_v4(), now);
      if let Some(parent) = record.kind.parent_series_id() {
        record.parent_record_id = ensure_series(&tx, parent, now)?;
      }
      insert_record(&tx, &record)?;
      record
    }
  };

  if record.kind == MediaKind::Series {
    adopt_seasons(&tx, &record)?;
  }
  tx.commit()?;
  Ok(record)
}

/// Read-modify-write of one record. Identity and `saved_at` survive `mutate`;
/// the parent link follows a changed parent series.
fn modify_tx(
  conn: &mut Connection,
  id: RecordId,
  mutate: impl FnOnce(&mut Record),
) -> Result<Option<Record>> {
  let tx = conn.transaction()?;
  let Some(before) = by_id(&tx, id)? else {
    return Ok(None);
  };

  let mut after = before.clone();
  mutate(&mut after);
  after.record_id = before.record_id;
  after.saved_at = before.saved_at;

  if after.catalog_id != before.catalog_id && by_catalog_id(&tx, after.catalog_id)?.is_some() {
    return Err(Error::DuplicateCatalogId(after.catalog_id));
  }
  if after.kind.parent_series_id() != before.kind.parent_series_id() {
    after.parent_record_id = match after.kind.parent_series_id() {
      Some(parent) => ensure_series(&tx, parent, Utc::now())?,
      None => None,
    };
  }

  update_record(&tx, &after)?;
  if after.kind == MediaKind::Series {
    adopt_seasons(&tx, &after)?;
  }
  tx.commit()?;
  Ok(Some(after))
}

/// Delete one record, unlinking any season that points at it.
fn delete_tx(conn: &mut Connection, id: RecordId) -> Result<bool> {
  let tx = conn.transaction()?;
  let id = encode_uuid(id);
  tx.execute(
    "UPDATE media SET parent_record_id = NULL WHERE parent_record_id = ?1",
    [&id],
  )?;
  let removed = tx.execute("DELETE FROM media WHERE record_id = ?1", [&id])?;
  tx.commit()?;
  Ok(removed > 0)
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  async fn insert(&self, input: NewRecord) -> Result<Record> {
    let now = Utc::now();
    self.with_conn(move |conn| insert_tx(conn, input, now)).await
  }

  async fn replace(&self, id: RecordId, input: NewRecord) -> Result<Option<Record>> {
    let result = self
      .with_conn(move |conn| modify_tx(conn, id, |record| record.apply(input)))
      .await?;
    if result.is_none() {
      warn!(%id, "replace: no such record");
    }
    Ok(result)
  }

  async fn update<F>(&self, id: RecordId, mutate: F) -> Result<Option<Record>>
  where
    F: FnOnce(&mut Record) + Send + 'static,
  {
    let result = self.with_conn(move |conn| modify_tx(conn, id, mutate)).await?;
    if result.is_none() {
      warn!(%id, "update: no such record");
    }
    Ok(result)
  }

  async fn toggle_favorite(&self, id: RecordId) -> Result<Option<Record>> {
    let result = self
      .with_conn(move |conn| modify_tx(conn, id, |record| record.favorite = !record.favorite))
      .await?;
    if result.is_none() {
      warn!(%id, "toggle_favorite: no such record");
    }
    Ok(result)
  }

  async fn delete(&self, id: RecordId) -> Result<()> {
    if !self.with_conn(move |conn| delete_tx(conn, id)).await? {
      warn!(%id, "delete: no such record");
    }
    Ok(())
  }

  async fn delete_by_catalog_id(&self, catalog_id: CatalogId) -> Result<()> {
    let removed = self
      .with_conn(move |conn| match by_catalog_id(conn, catalog_id)? {
        Some(record) => delete_tx(conn, record.record_id),
        None => Ok(false),
      })
      .await?;
    if !removed {
      warn!(catalog_id, "delete_by_catalog_id: no such record");
    }
    Ok(())
  }

  async fn delete_all(&self) -> Result<usize> {
    self
      .with_conn(|conn| Ok(conn.execute("DELETE FROM media", [])?))
      .await
  }

  async fn get(&self, id: RecordId) -> Result<Option<Record>> {
    self.with_conn(move |conn| by_id(conn, id)).await
  }

  async fn get_by_catalog_id(&self, catalog_id: CatalogId) -> Result<Option<Record>> {
    self.with_conn(move |conn| by_catalog_id(conn, catalog_id)).await
  }

  async fn list(&self, query: &RecordQuery) -> Result<Vec<Record>> {
    let raws: Vec<RawRecord> = self
      .with_conn(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RECORD_COLUMNS} FROM media ORDER BY saved_at, rowid"
        ))?;
        let rows = stmt
          .query_map([], RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut records = Vec::with_capacity(raws.len());
    for raw in raws {
      let record = raw.into_record()?;
      if query.matches(&record) {
        records.push(record);
      }
    }
    Ok(records)
  }

  async fn count(&self) -> Result<usize> {
    self
      .with_conn(|conn| {
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM media", [], |row| row.get(0))?;
        Ok(usize::try_from(n).unwrap_or_default())
      })
      .await
  }
}
