//! Integration tests for `SqliteStore`, the migration plan and the store
//! manager, against in-memory and temporary on-disk databases.

use chrono::NaiveDate;
use rusqlite::{types::Value, Connection};
use uuid::Uuid;
use watchlog_core::{
  record::{MediaKind, NewRecord, WatchState},
  store::{KindFilter, RecordQuery, RecordStore},
  version::SchemaVersion,
};

use crate::{
  generations::{self, v1_0, v1_1, v2_0, v2_1, v2_2, Common, GENERATIONS},
  migrate::{CustomMigration, Generation, MigrationPlan, StageKind},
  Error, SqliteStore, StoreLocation, StoreManager,
};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn frieren() -> NewRecord { NewRecord::new(209867, "Frieren", MediaKind::Series) }

fn season_one() -> NewRecord {
  NewRecord::new(
    107288,
    "Frieren Season 1",
    MediaKind::Season { season_number: 1, parent_series_id: 209867 },
  )
}

fn date(s: &str) -> NaiveDate { NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap() }

// ─── CRUD ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_get() {
  let s = store().await;

  let record = s.insert(frieren()).await.unwrap();
  assert_eq!(record.catalog_id, 209867);
  assert!(record.visible);

  let fetched = s.get(record.record_id).await.unwrap().unwrap();
  assert_eq!(fetched, record);

  let by_catalog = s.get_by_catalog_id(209867).await.unwrap().unwrap();
  assert_eq!(by_catalog.record_id, record.record_id);
}

#[tokio::test]
async fn get_missing_returns_none() {
  let s = store().await;
  assert!(s.get(Uuid::new_v4()).await.unwrap().is_none());
  assert!(s.get_by_catalog_id(1).await.unwrap().is_none());
}

#[tokio::test]
async fn frieren_insert_list_delete() {
  let s = store().await;
  s.insert(frieren()).await.unwrap();

  let all = s.list(&RecordQuery::default()).await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].catalog_id, 209867);
  assert_eq!(all[0].name, "Frieren");

  s.delete_by_catalog_id(209867).await.unwrap();
  assert!(s.list(&RecordQuery::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_catalog_id_is_rejected() {
  let s = store().await;
  s.insert(frieren()).await.unwrap();

  let err = s.insert(frieren()).await.unwrap_err();
  assert!(matches!(err, Error::DuplicateCatalogId(209867)));
  assert_eq!(s.count().await.unwrap(), 1);
}

#[tokio::test]
async fn replace_keeps_identity() {
  let s = store().await;
  let original = s.insert(frieren()).await.unwrap();

  let mut input = NewRecord::new(209867, "Sousou no Frieren", MediaKind::Series);
  input.notes = "rewatch".into();
  input.localized_names.insert("ja".into(), "葬送のフリーレン".into());
  let replaced = s.replace(original.record_id, input).await.unwrap().unwrap();

  assert_eq!(replaced.record_id, original.record_id);
  assert_eq!(replaced.saved_at, original.saved_at);
  assert_eq!(replaced.name, "Sousou no Frieren");

  let fetched = s.get(original.record_id).await.unwrap().unwrap();
  assert_eq!(fetched.notes, "rewatch");
  assert_eq!(fetched.localized_names["ja"], "葬送のフリーレン");
}

#[tokio::test]
async fn update_cannot_change_identity() {
  let s = store().await;
  let original = s.insert(frieren()).await.unwrap();

  let updated = s
    .update(original.record_id, |r| {
      r.record_id = Uuid::new_v4();
      r.saved_at = chrono::Utc::now() + chrono::Duration::days(1);
      r.mark_watching(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    })
    .await
    .unwrap()
    .unwrap();

  assert_eq!(updated.record_id, original.record_id);
  assert_eq!(updated.saved_at, original.saved_at);
  assert_eq!(updated.watch_state, WatchState::Watching);
  assert_eq!(s.count().await.unwrap(), 1);
}

#[tokio::test]
async fn update_to_taken_catalog_id_fails() {
  let s = store().await;
  s.insert(frieren()).await.unwrap();
  let movie = s
    .insert(NewRecord::new(129, "Spirited Away", MediaKind::Movie))
    .await
    .unwrap();

  let err = s.update(movie.record_id, |r| r.catalog_id = 209867).await.unwrap_err();
  assert!(matches!(err, Error::DuplicateCatalogId(209867)));
}

#[tokio::test]
async fn toggle_favorite_flips() {
  let s = store().await;
  let r = s.insert(frieren()).await.unwrap();

  assert!(s.toggle_favorite(r.record_id).await.unwrap().unwrap().favorite);
  assert!(!s.toggle_favorite(r.record_id).await.unwrap().unwrap().favorite);
}

#[tokio::test]
async fn orphan_operations_are_noops() {
  let s = store().await;
  s.insert(frieren()).await.unwrap();
  let ghost = Uuid::new_v4();

  assert!(s.update(ghost, |r| r.favorite = true).await.unwrap().is_none());
  assert!(s.replace(ghost, frieren()).await.unwrap().is_none());
  assert!(s.toggle_favorite(ghost).await.unwrap().is_none());
  s.delete(ghost).await.unwrap();
  s.delete_by_catalog_id(404).await.unwrap();

  assert_eq!(s.count().await.unwrap(), 1);
}

#[tokio::test]
async fn delete_all_reports_count() {
  let s = store().await;
  s.insert(frieren()).await.unwrap();
  s.insert(NewRecord::new(129, "Spirited Away", MediaKind::Movie)).await.unwrap();

  assert_eq!(s.delete_all().await.unwrap(), 2);
  assert_eq!(s.count().await.unwrap(), 0);
}

#[tokio::test]
async fn list_filters_and_orders_by_saved_at() {
  let s = store().await;
  let series = s.insert(frieren()).await.unwrap();
  let movie = s
    .insert(NewRecord::new(129, "Spirited Away", MediaKind::Movie))
    .await
    .unwrap();
  s.toggle_favorite(movie.record_id).await.unwrap();

  let all = s.list(&RecordQuery::default()).await.unwrap();
  let ids: Vec<_> = all.iter().map(|r| r.record_id).collect();
  assert_eq!(ids, vec![series.record_id, movie.record_id]);

  let movies = s
    .list(&RecordQuery { kind: Some(KindFilter::Movie), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(movies.len(), 1);
  assert_eq!(movies[0].catalog_id, 129);

  let favorites = s
    .list(&RecordQuery { favorites_only: true, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(favorites.len(), 1);
  assert_eq!(favorites[0].record_id, movie.record_id);
}

// ─── Seasons and placeholders ────────────────────────────────────────────────

#[tokio::test]
async fn season_without_series_creates_hidden_placeholder() {
  let s = store().await;
  let season = s.insert(season_one()).await.unwrap();

  let placeholder = s.get_by_catalog_id(209867).await.unwrap().unwrap();
  assert!(!placeholder.visible);
  assert_eq!(placeholder.kind, MediaKind::Series);
  assert_eq!(season.parent_record_id, Some(placeholder.record_id));

  assert_eq!(s.list(&RecordQuery::default()).await.unwrap().len(), 1);
  let everything = RecordQuery { include_hidden: true, ..Default::default() };
  assert_eq!(s.list(&everything).await.unwrap().len(), 2);
  assert_eq!(s.count().await.unwrap(), 2);
}

#[tokio::test]
async fn inserting_series_promotes_placeholder() {
  let s = store().await;
  let season = s.insert(season_one()).await.unwrap();
  let placeholder_id = season.parent_record_id.unwrap();

  let series = s.insert(frieren()).await.unwrap();
  assert_eq!(series.record_id, placeholder_id);
  assert!(series.visible);
  assert_eq!(series.name, "Frieren");
  assert_eq!(s.count().await.unwrap(), 2);

  let children = s
    .list(&RecordQuery { parent: Some(series.record_id), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(children.len(), 1);
  assert_eq!(children[0].record_id, season.record_id);
}

#[tokio::test]
async fn non_series_cannot_take_over_placeholder() {
  let s = store().await;
  let season = s.insert(season_one()).await.unwrap();
  let placeholder_id = season.parent_record_id.unwrap();

  let err = s
    .insert(NewRecord::new(209867, "Not Frieren", MediaKind::Movie))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DuplicateCatalogId(209867)));

  let placeholder = s.get(placeholder_id).await.unwrap().unwrap();
  assert_eq!(placeholder.kind, MediaKind::Series);
  assert!(!placeholder.visible);
  assert_eq!(
    s.get(season.record_id).await.unwrap().unwrap().parent_record_id,
    Some(placeholder_id)
  );
}

#[tokio::test]
async fn season_links_to_existing_series() {
  let s = store().await;
  let series = s.insert(frieren()).await.unwrap();
  let season = s.insert(season_one()).await.unwrap();
  assert_eq!(season.parent_record_id, Some(series.record_id));
  assert_eq!(s.count().await.unwrap(), 2);
}

#[tokio::test]
async fn deleting_series_unlinks_seasons() {
  let s = store().await;
  let series = s.insert(frieren()).await.unwrap();
  let season = s.insert(season_one()).await.unwrap();

  s.delete(series.record_id).await.unwrap();

  let orphan = s.get(season.record_id).await.unwrap().unwrap();
  assert_eq!(orphan.parent_record_id, None);
  assert_eq!(s.count().await.unwrap(), 1);
}

#[tokio::test]
async fn reinserted_series_adopts_unlinked_seasons() {
  let s = store().await;
  let season = s.insert(season_one()).await.unwrap();
  s.delete(season.parent_record_id.unwrap()).await.unwrap();

  let series = s.insert(frieren()).await.unwrap();
  let relinked = s.get(season.record_id).await.unwrap().unwrap();
  assert_eq!(relinked.parent_record_id, Some(series.record_id));
}

// ─── Migration plan ──────────────────────────────────────────────────────────

const SERIES_CATALOG: i64 = 24835;
const SEASON_CATALOG: i64 = 60625;
const MOVIE_CATALOG: i64 = 129;

/// A raw connection at generation 1.0.0 holding a series, one of its seasons
/// (watched) and a movie (being watched).
fn seeded_v1_0() -> Connection {
  let mut conn = Connection::open_in_memory().unwrap();
  seed_v1_0(&mut conn);
  conn
}

fn seed_v1_0(conn: &mut Connection) {
  MigrationPlan::current()
    .apply_until(conn, v1_0::VERSION)
    .unwrap();

  let series = v1_0::Row::new(
    Common::new(SERIES_CATALOG, "Mushoku Tensei", "2024-01-01T10:00:00+00:00"),
    "series",
  );
  let mut season = v1_0::Row::new(
    Common::new(SEASON_CATALOG, "Season 1", "2024-01-02T10:00:00+00:00"),
    "season",
  );
  season.season_number = Some(1);
  season.parent_series_id = Some(SERIES_CATALOG);
  season.watched = true;
  let mut movie = v1_0::Row::new(
    Common::new(MOVIE_CATALOG, "Spirited Away", "2024-01-03T10:00:00+00:00"),
    "movie",
  );
  movie.watching = true;

  for row in [&series, &season, &movie] {
    v1_0::insert(conn, row).unwrap();
  }
}

fn catalog_ids(conn: &Connection) -> Vec<(i64, String)> {
  let mut stmt = conn
    .prepare("SELECT catalog_id, record_id FROM media ORDER BY catalog_id")
    .unwrap();
  stmt
    .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
    .unwrap()
    .collect::<rusqlite::Result<Vec<_>>>()
    .unwrap()
}

fn tag(conn: &Connection) -> Option<SchemaVersion> {
  MigrationPlan::on_disk_version(conn).unwrap()
}

/// `(name, type, notnull, default, pk)` for every column of `media`.
fn table_shape(conn: &Connection) -> Vec<(String, String, bool, Option<String>, bool)> {
  let mut stmt = conn.prepare("PRAGMA table_info(media)").unwrap();
  stmt
    .query_map([], |row| Ok((row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?)))
    .unwrap()
    .collect::<rusqlite::Result<Vec<_>>>()
    .unwrap()
}

fn dump(conn: &Connection) -> Vec<Vec<Value>> {
  let mut stmt = conn.prepare("SELECT * FROM media ORDER BY rowid").unwrap();
  let width = stmt.column_count();
  stmt
    .query_map([], |row| {
      (0..width)
        .map(|i| row.get::<_, Value>(i))
        .collect::<rusqlite::Result<Vec<Value>>>()
    })
    .unwrap()
    .collect::<rusqlite::Result<Vec<_>>>()
    .unwrap()
}

#[test]
fn registry_is_a_valid_chain() {
  let plan = MigrationPlan::new(GENERATIONS, v1_0::DDL, v2_2::CURRENT_DDL).unwrap();
  assert_eq!(plan.oldest(), v1_0::VERSION);
  assert_eq!(plan.newest(), generations::CURRENT);
  assert_eq!(plan.stages().count(), GENERATIONS.len() - 1);

  let custom: Vec<_> = plan
    .stages()
    .filter(|s| matches!(s.kind, StageKind::Custom(_)))
    .map(|s| s.target)
    .collect();
  assert_eq!(custom, vec![v2_0::VERSION, v2_1::VERSION]);
}

#[test]
fn out_of_order_chain_is_rejected() {
  static SWAPPED: &[Generation] = &[
    Generation { version: v1_1::VERSION, record_types: &["media"], upgrade: None },
    Generation {
      version:      v1_0::VERSION,
      record_types: &["media"],
      upgrade:      Some(StageKind::Lightweight { ddl: "" }),
    },
  ];
  static GAP: &[Generation] = &[
    Generation { version: v1_0::VERSION, record_types: &["media"], upgrade: None },
    Generation { version: v1_1::VERSION, record_types: &["media"], upgrade: None },
  ];

  let err = MigrationPlan::new(SWAPPED, "", "").unwrap_err();
  assert!(matches!(err, Error::BrokenChain(v) if v == v1_0::VERSION));
  let err = MigrationPlan::new(GAP, "", "").unwrap_err();
  assert!(matches!(err, Error::BrokenChain(v) if v == v1_1::VERSION));
  assert!(MigrationPlan::new(&[], "", "").is_err());
}

#[test]
fn pending_is_everything_after_on_disk() {
  let plan = MigrationPlan::current();
  let pending: Vec<_> = plan.pending(v1_1::VERSION).iter().map(|g| g.version).collect();
  assert_eq!(pending, vec![v2_0::VERSION, v2_1::VERSION, v2_2::VERSION]);
  assert!(plan.pending(plan.newest()).is_empty());
}

#[test]
fn every_stage_preserves_every_record() {
  let plan = MigrationPlan::current();
  let mut conn = seeded_v1_0();
  let before = catalog_ids(&conn);
  assert_eq!(before.len(), 3);

  for stage in plan.stages() {
    assert_eq!(tag(&conn), Some(stage.source));
    let report = plan.apply_until(&mut conn, stage.target).unwrap();
    assert_eq!(report.stages.len(), 1, "{} → {}", stage.source, stage.target);
    assert_eq!(tag(&conn), Some(stage.target));
    assert_eq!(catalog_ids(&conn), before, "{} → {}", stage.source, stage.target);
  }
}

#[test]
fn lightweight_stage_fills_defaults() {
  let plan = MigrationPlan::current();
  let mut conn = seeded_v1_0();
  plan.apply_until(&mut conn, v1_1::VERSION).unwrap();

  let rows = v1_1::read_all(&conn).unwrap();
  assert!(rows.iter().all(|r| r.started_on.is_none() && !r.custom_poster));
}

#[test]
fn flat_kind_becomes_tagged_kind() {
  let plan = MigrationPlan::current();
  let mut conn = seeded_v1_0();
  let report = plan.apply_until(&mut conn, v2_0::VERSION).unwrap();
  assert_eq!(report.stages.last().unwrap().rows, Some(3));

  let rows = v2_0::read_all(&conn).unwrap();
  let find = |id| rows.iter().find(|r| r.common.catalog_id == id).unwrap();
  let series = find(SERIES_CATALOG);
  let season = find(SEASON_CATALOG);
  let movie = find(MOVIE_CATALOG);

  assert_eq!(series.kind, MediaKind::Series);
  assert_eq!(
    season.kind,
    MediaKind::Season { season_number: 1, parent_series_id: SERIES_CATALOG }
  );
  assert_eq!(season.parent_record_id.as_deref(), Some(series.common.record_id.as_str()));
  assert_eq!(movie.kind, MediaKind::Movie);
  assert_eq!(movie.parent_record_id, None);
  assert!(rows.iter().all(|r| r.visible));
  assert_eq!(movie.common.name, "Spirited Away");
}

#[test]
fn watch_flags_become_watch_state() {
  let plan = MigrationPlan::current();
  let mut conn = seeded_v1_0();
  plan.apply_until(&mut conn, v2_1::VERSION).unwrap();

  let rows = v2_1::read_all(&conn).unwrap();
  let find = |id| rows.iter().find(|r| r.common.catalog_id == id).unwrap();

  let season = find(SEASON_CATALOG);
  assert_eq!(season.watch_state, WatchState::Watched);
  assert_eq!(season.finished_on.as_deref(), Some("2024-01-02"));
  assert_eq!(season.started_on.as_deref(), Some("2024-01-02"));

  let movie = find(MOVIE_CATALOG);
  assert_eq!(movie.watch_state, WatchState::Watching);
  assert_eq!(movie.started_on.as_deref(), Some("2024-01-03"));
  assert_eq!(movie.finished_on, None);

  assert_eq!(find(SERIES_CATALOG).watch_state, WatchState::PlanToWatch);
}

#[test]
fn fold_watch_flags_cases() {
  let saved = date("2024-05-05");
  let s = |v: &str| Some(v.to_owned());

  // watched wins over watching and keeps known dates
  assert_eq!(
    v2_1::fold_watch_flags(true, true, s("2024-01-01"), s("2024-02-01"), saved),
    (WatchState::Watched, s("2024-01-01"), s("2024-02-01"))
  );
  assert_eq!(
    v2_1::fold_watch_flags(true, false, None, None, saved),
    (WatchState::Watched, s("2024-05-05"), s("2024-05-05"))
  );
  assert_eq!(
    v2_1::fold_watch_flags(false, true, None, s("2024-02-01"), saved),
    (WatchState::Watching, s("2024-05-05"), None)
  );
  assert_eq!(
    v2_1::fold_watch_flags(false, false, s("2024-01-01"), None, saved),
    (WatchState::PlanToWatch, s("2024-01-01"), None)
  );
}

#[test]
fn malformed_season_aborts_stage_and_rolls_back() {
  let plan = MigrationPlan::current();
  let mut conn = seeded_v1_0();
  let mut broken = v1_0::Row::new(
    Common::new(999, "Broken", "2024-01-04T10:00:00+00:00"),
    "season",
  );
  broken.parent_series_id = Some(SERIES_CATALOG);
  v1_0::insert(&conn, &broken).unwrap();

  let err = plan.apply(&mut conn).unwrap_err();
  assert!(matches!(err, Error::InvalidRow { catalog_id: 999, .. }));

  assert_eq!(tag(&conn), Some(v1_1::VERSION));
  assert!(generations::has_column(&conn, "media", "season_number").unwrap());
  assert_eq!(catalog_ids(&conn).len(), 4);
}

#[test]
fn unknown_flat_kind_is_invalid() {
  let mut row: v1_1::Row =
    v1_0::Row::new(Common::new(5, "Clip", "2024-01-01T00:00:00+00:00"), "short").into();
  assert!(matches!(v2_0::flat_kind(&row), Err(Error::InvalidRow { catalog_id: 5, .. })));
  row.kind = "movie".into();
  assert_eq!(v2_0::flat_kind(&row).unwrap(), MediaKind::Movie);
}

#[test]
fn custom_stage_rerun_is_a_noop() {
  let plan = MigrationPlan::current();
  let mut conn = seeded_v1_0();
  plan.apply_until(&mut conn, v2_0::VERSION).unwrap();
  let before = dump(&conn);

  let tx = conn.transaction().unwrap();
  assert!(v2_0::SeasonKindMigration::will_migrate(&tx).unwrap().is_empty());
  assert_eq!(v2_0::SeasonKindMigration::did_migrate(&tx, Vec::new()).unwrap(), 0);
  tx.commit().unwrap();

  assert_eq!(dump(&conn), before);
}

#[test]
fn upsert_converges_instead_of_duplicating() {
  let plan = MigrationPlan::current();
  let mut conn = seeded_v1_0();
  plan.apply_until(&mut conn, v2_1::VERSION).unwrap();

  let rows = v2_1::read_all(&conn).unwrap();
  for row in &rows {
    v2_1::upsert(&conn, row).unwrap();
  }
  assert_eq!(v2_1::read_all(&conn).unwrap(), rows);
}

#[test]
fn full_plan_is_idempotent() {
  let plan = MigrationPlan::current();
  let mut conn = seeded_v1_0();
  let first = plan.apply(&mut conn).unwrap();
  assert_eq!(first.from, Some(v1_0::VERSION));
  assert_eq!(first.stages.len(), 4);

  let before = dump(&conn);
  let second = plan.apply(&mut conn).unwrap();
  assert!(second.is_noop());
  assert_eq!(dump(&conn), before);
}

#[test]
fn fresh_schema_matches_migrated_schema() {
  let plan = MigrationPlan::current();
  let mut fresh = Connection::open_in_memory().unwrap();
  let report = plan.apply(&mut fresh).unwrap();
  assert!(report.created);
  assert!(report.stages.is_empty());

  let mut migrated = seeded_v1_0();
  plan.apply(&mut migrated).unwrap();

  assert_eq!(table_shape(&fresh), table_shape(&migrated));
  assert_eq!(tag(&fresh), tag(&migrated));
}

#[test]
fn newer_store_is_refused() {
  let plan = MigrationPlan::current();
  let mut conn = Connection::open_in_memory().unwrap();
  plan.apply(&mut conn).unwrap();
  conn
    .pragma_update(None, "user_version", SchemaVersion::new(3, 0, 0).packed().unwrap())
    .unwrap();

  let err = plan.apply(&mut conn).unwrap_err();
  assert!(matches!(err, Error::StoreTooNew { on_disk, .. } if on_disk == SchemaVersion::new(3, 0, 0)));
}

#[test]
fn unknown_tag_is_refused() {
  let plan = MigrationPlan::current();
  let mut conn = Connection::open_in_memory().unwrap();
  plan.apply(&mut conn).unwrap();
  let odd = SchemaVersion::new(1, 5, 0).packed().unwrap();
  conn.pragma_update(None, "user_version", odd).unwrap();
  assert!(matches!(plan.apply(&mut conn).unwrap_err(), Error::UnknownGeneration(t) if t == odd));

  let mut untagged = Connection::open_in_memory().unwrap();
  untagged.execute_batch(v1_0::DDL).unwrap();
  assert!(matches!(plan.apply(&mut untagged).unwrap_err(), Error::UnknownGeneration(0)));
}

#[test]
fn check_file_reports_without_migrating() {
  let plan = MigrationPlan::current();
  let dir = tempfile::tempdir().unwrap();

  let old = dir.path().join("old.sqlite");
  seed_v1_0(&mut Connection::open(&old).unwrap());
  assert_eq!(plan.check_file(&old).unwrap(), Some(v1_0::VERSION));
  assert_eq!(tag(&Connection::open(&old).unwrap()), Some(v1_0::VERSION));

  let newer = dir.path().join("newer.sqlite");
  {
    let conn = Connection::open(&newer).unwrap();
    conn.execute_batch(v2_2::CURRENT_DDL).unwrap();
    conn
      .pragma_update(None, "user_version", SchemaVersion::new(9, 0, 0).packed().unwrap())
      .unwrap();
  }
  assert!(matches!(plan.check_file(&newer).unwrap_err(), Error::StoreTooNew { .. }));

  let garbage = dir.path().join("garbage.sqlite");
  std::fs::write(&garbage, vec![7_u8; 4096]).unwrap();
  assert!(plan.check_file(&garbage).is_err());

  let missing = dir.path().join("missing.sqlite");
  assert!(plan.check_file(&missing).is_err());
  assert!(!missing.exists());
}

// ─── On-disk stores ──────────────────────────────────────────────────────────

#[tokio::test]
async fn opening_old_store_file_migrates_it() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("Library.sqlite");
  seed_v1_0(&mut Connection::open(&path).unwrap());

  let (s, report) = SqliteStore::open_with_report(&path).await.unwrap();
  assert_eq!(report.from, Some(v1_0::VERSION));
  assert_eq!(report.to, generations::CURRENT);
  assert_eq!(report.stages.len(), 4);
  assert_eq!(s.schema_version().await.unwrap(), Some(generations::CURRENT));

  let season = s.get_by_catalog_id(SEASON_CATALOG).await.unwrap().unwrap();
  let series = s.get_by_catalog_id(SERIES_CATALOG).await.unwrap().unwrap();
  assert_eq!(season.parent_record_id, Some(series.record_id));
  assert_eq!(season.watch_state, WatchState::Watched);
  assert_eq!(season.finished_on, Some(date("2024-01-02")));
  assert!(season.is_consistent());
  assert!(season.localized_names.is_empty());
  s.close().await.unwrap();

  let (_, again) = SqliteStore::open_with_report(&path).await.unwrap();
  assert!(again.is_noop());
}

#[tokio::test]
async fn manager_reload_reopens_same_files() {
  let dir = tempfile::tempdir().unwrap();
  let manager = StoreManager::open(StoreLocation::disk(dir.path(), "Library"))
    .await
    .unwrap();
  assert!(dir.path().join("Library.sqlite").exists());

  let stale = manager.store().await.unwrap();
  stale.insert(frieren()).await.unwrap();

  let report = manager.reload().await.unwrap();
  assert!(report.is_noop());

  assert!(matches!(stale.count().await.unwrap_err(), Error::Database(_)));
  assert_eq!(manager.store().await.unwrap().count().await.unwrap(), 1);
}

#[tokio::test]
async fn suspended_manager_hands_out_nothing() {
  let dir = tempfile::tempdir().unwrap();
  let manager = StoreManager::open(StoreLocation::disk(dir.path(), "Library"))
    .await
    .unwrap();
  manager.store().await.unwrap().insert(frieren()).await.unwrap();

  manager.suspend().await.unwrap();
  assert!(manager.is_suspended().await);
  assert!(matches!(manager.store().await.err(), Some(Error::Suspended)));
  manager.suspend().await.unwrap();

  manager.reload().await.unwrap();
  assert_eq!(manager.store().await.unwrap().count().await.unwrap(), 1);
}

#[tokio::test]
async fn memory_manager_reloads_empty() {
  let manager = StoreManager::in_memory().await.unwrap();
  manager.store().await.unwrap().insert(frieren()).await.unwrap();
  assert_eq!(manager.schema_version(), generations::CURRENT);
  assert_eq!(manager.location().main_file(), None);

  manager.reload().await.unwrap();
  assert_eq!(manager.store().await.unwrap().count().await.unwrap(), 0);
}
