//! The `RecordStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `watchlog-store-sqlite`).
//! Presentation and catalog-lookup code depend on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use crate::record::{CatalogId, MediaKind, NewRecord, Record, RecordId, WatchState};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Coarse kind filter for [`RecordQuery`]; seasons match regardless of their
/// number or parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindFilter {
  Movie,
  Series,
  Season,
}

impl KindFilter {
  pub fn matches(self, kind: &MediaKind) -> bool {
    matches!(
      (self, kind),
      (Self::Movie, MediaKind::Movie)
        | (Self::Series, MediaKind::Series)
        | (Self::Season, MediaKind::Season { .. })
    )
  }
}

/// Parameters for [`RecordStore::list`]. The default lists every visible
/// record.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
  pub kind:           Option<KindFilter>,
  pub watch_state:    Option<WatchState>,
  pub favorites_only: bool,
  /// Restrict to seasons linked to this series record.
  pub parent:         Option<RecordId>,
  /// Also return placeholder records that are hidden from the library.
  pub include_hidden: bool,
}

impl RecordQuery {
  pub fn matches(&self, record: &Record) -> bool {
    (self.include_hidden || record.visible)
      && self.kind.is_none_or(|k| k.matches(&record.kind))
      && self.watch_state.is_none_or(|s| s == record.watch_state)
      && (!self.favorites_only || record.favorite)
      && self.parent.is_none_or(|p| record.parent_record_id == Some(p))
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Watchlog record store backend.
///
/// Operations addressed at a record that does not exist are not errors: the
/// backend logs a warning and returns `None` (or `()`), leaving the store
/// untouched.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Persist a new record. `record_id` and `saved_at` are assigned by the
  /// store.
  ///
  /// Inserting a season whose series is not stored creates a hidden
  /// placeholder series and links the season to it.
  fn insert(
    &self,
    input: NewRecord,
  ) -> impl Future<Output = Result<Record, Self::Error>> + Send + '_;

  /// Replace every caller-controlled field of an existing record.
  fn replace(
    &self,
    id: RecordId,
    input: NewRecord,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + '_;

  /// Apply `mutate` to the stored record and persist the result.
  ///
  /// `record_id` and `saved_at` are restored after `mutate` runs.
  fn update<F>(
    &self,
    id: RecordId,
    mutate: F,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + '_
  where
    F: FnOnce(&mut Record) + Send + 'static;

  /// Flip the favorite flag.
  fn toggle_favorite(
    &self,
    id: RecordId,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + '_;

  /// Delete one record. Seasons pointing at it keep existing, unlinked.
  fn delete(
    &self,
    id: RecordId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete the record with the given catalog ID, if any.
  fn delete_by_catalog_id(
    &self,
    catalog_id: CatalogId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Remove every record. Returns the number of rows removed.
  fn delete_all(&self) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn get(
    &self,
    id: RecordId,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + '_;

  fn get_by_catalog_id(
    &self,
    catalog_id: CatalogId,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + '_;

  /// All records matching `query`, ordered by `saved_at` (oldest first).
  fn list<'a>(
    &'a self,
    query: &'a RecordQuery,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + 'a;

  /// Number of stored rows, hidden placeholders included.
  fn count(&self) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;

  fn season(parent: Option<RecordId>) -> Record {
    let mut r = NewRecord::new(
      1,
      "Season 1",
      MediaKind::Season { season_number: 1, parent_series_id: 24835 },
    )
    .into_record(Uuid::new_v4(), Utc::now());
    r.parent_record_id = parent;
    r
  }

  #[test]
  fn default_query_hides_placeholders() {
    let mut r = season(None);
    assert!(RecordQuery::default().matches(&r));
    r.visible = false;
    assert!(!RecordQuery::default().matches(&r));
    assert!(RecordQuery { include_hidden: true, ..Default::default() }.matches(&r));
  }

  #[test]
  fn kind_and_parent_filters() {
    let parent = Uuid::new_v4();
    let r = season(Some(parent));

    let seasons = RecordQuery { kind: Some(KindFilter::Season), ..Default::default() };
    let movies = RecordQuery { kind: Some(KindFilter::Movie), ..Default::default() };
    assert!(seasons.matches(&r));
    assert!(!movies.matches(&r));

    let of_parent = RecordQuery { parent: Some(parent), ..Default::default() };
    let of_other = RecordQuery { parent: Some(Uuid::new_v4()), ..Default::default() };
    assert!(of_parent.matches(&r));
    assert!(!of_other.matches(&r));
  }

  #[test]
  fn favorites_and_state_filters() {
    let mut r = season(None);
    let favs = RecordQuery { favorites_only: true, ..Default::default() };
    assert!(!favs.matches(&r));
    r.favorite = true;
    assert!(favs.matches(&r));

    let watching = RecordQuery { watch_state: Some(WatchState::Watching), ..Default::default() };
    assert!(!watching.matches(&r));
  }
}
