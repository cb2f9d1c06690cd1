//! Records — one user-tracked media item per row.
//!
//! A record pairs catalog metadata (name, synopsis, artwork) with user state
//! (watch progress, favorite flag, notes). The catalog ID is the natural key
//! and survives every schema generation unchanged; the record ID is the
//! store's own persistent identifier.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persistent identifier assigned by the store.
pub type RecordId = Uuid;

/// Stable identifier from the remote metadata catalog.
pub type CatalogId = i64;

// ─── Kind ────────────────────────────────────────────────────────────────────

/// What a record represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaKind {
  Movie,
  Series,
  /// One season of a series. `parent_series_id` is the catalog ID of the
  /// series, which may or may not be stored as its own record.
  Season {
    season_number:    u32,
    parent_series_id: CatalogId,
  },
}

impl MediaKind {
  /// The discriminant, matching the serde tag.
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::Movie => "movie",
      Self::Series => "series",
      Self::Season { .. } => "season",
    }
  }

  pub fn parent_series_id(&self) -> Option<CatalogId> {
    match self {
      Self::Season { parent_series_id, .. } => Some(*parent_series_id),
      _ => None,
    }
  }
}

// ─── Watch state ─────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum WatchState {
  #[default]
  PlanToWatch,
  Watching,
  Watched,
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A stored media item at the current schema generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
  pub record_id:           RecordId,
  pub catalog_id:          CatalogId,
  pub name:                String,
  /// Locale code → localized display name.
  pub localized_names:     BTreeMap<String, String>,
  pub overview:            Option<String>,
  pub localized_overviews: BTreeMap<String, String>,
  pub release_date:        Option<NaiveDate>,
  pub kind:                MediaKind,
  pub homepage:            Option<String>,
  pub poster_path:         Option<String>,
  pub backdrop_path:       Option<String>,
  /// Store-assigned; never changes after insert.
  pub saved_at:            DateTime<Utc>,
  pub watch_state:         WatchState,
  pub started_on:          Option<NaiveDate>,
  pub finished_on:         Option<NaiveDate>,
  pub favorite:            bool,
  pub notes:               String,
  /// The user replaced the catalog poster with their own.
  pub custom_poster:       bool,
  /// Weak link from a season to its series record. Deleting the series
  /// clears this; it never deletes the season.
  pub parent_record_id:    Option<RecordId>,
  /// `false` for placeholder series created implicitly for a season.
  pub visible:             bool,
}

impl Record {
  /// Reset to "plan to watch" and forget both dates.
  pub fn mark_plan_to_watch(&mut self) {
    self.watch_state = WatchState::PlanToWatch;
    self.started_on = None;
    self.finished_on = None;
  }

  /// Start watching on `on`. Any previous finish date is cleared.
  pub fn mark_watching(&mut self, on: NaiveDate) {
    self.watch_state = WatchState::Watching;
    self.started_on = Some(on);
    self.finished_on = None;
  }

  /// Finish watching on `on`. A missing start date is set to the same day.
  pub fn mark_watched(&mut self, on: NaiveDate) {
    self.watch_state = WatchState::Watched;
    self.started_on.get_or_insert(on);
    self.finished_on = Some(on);
  }

  /// Whether the watch state and the start/finish dates agree.
  pub fn is_consistent(&self) -> bool {
    match self.watch_state {
      WatchState::PlanToWatch => true,
      WatchState::Watching => self.started_on.is_some() && self.finished_on.is_none(),
      WatchState::Watched => self.finished_on.is_some(),
    }
  }

  /// Overwrite every caller-controlled field from `input`, keeping identity,
  /// `saved_at`, the parent link and visibility.
  pub fn apply(&mut self, input: NewRecord) {
    self.catalog_id = input.catalog_id;
    self.name = input.name;
    self.localized_names = input.localized_names;
    self.overview = input.overview;
    self.localized_overviews = input.localized_overviews;
    self.release_date = input.release_date;
    self.kind = input.kind;
    self.homepage = input.homepage;
    self.poster_path = input.poster_path;
    self.backdrop_path = input.backdrop_path;
    self.watch_state = input.watch_state;
    self.started_on = input.started_on;
    self.finished_on = input.finished_on;
    self.favorite = input.favorite;
    self.notes = input.notes;
    self.custom_poster = input.custom_poster;
  }
}

// ─── NewRecord ───────────────────────────────────────────────────────────────

/// Input to [`crate::store::RecordStore::insert`].
///
/// `record_id`, `saved_at`, `parent_record_id` and `visible` are always set by
/// the store; they are not accepted from callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
  pub catalog_id:          CatalogId,
  pub name:                String,
  pub localized_names:     BTreeMap<String, String>,
  pub overview:            Option<String>,
  pub localized_overviews: BTreeMap<String, String>,
  pub release_date:        Option<NaiveDate>,
  pub kind:                MediaKind,
  pub homepage:            Option<String>,
  pub poster_path:         Option<String>,
  pub backdrop_path:       Option<String>,
  pub watch_state:         WatchState,
  pub started_on:          Option<NaiveDate>,
  pub finished_on:         Option<NaiveDate>,
  pub favorite:            bool,
  pub notes:               String,
  pub custom_poster:       bool,
}

impl NewRecord {
  /// Convenience constructor with all optional fields set to their defaults.
  pub fn new(catalog_id: CatalogId, name: impl Into<String>, kind: MediaKind) -> Self {
    Self {
      catalog_id,
      name: name.into(),
      localized_names: BTreeMap::new(),
      overview: None,
      localized_overviews: BTreeMap::new(),
      release_date: None,
      kind,
      homepage: None,
      poster_path: None,
      backdrop_path: None,
      watch_state: WatchState::default(),
      started_on: None,
      finished_on: None,
      favorite: false,
      notes: String::new(),
      custom_poster: false,
    }
  }

  /// Materialise into a [`Record`] with store-assigned identity.
  pub fn into_record(self, record_id: RecordId, saved_at: DateTime<Utc>) -> Record {
    let mut record = Record {
      record_id,
      catalog_id: self.catalog_id,
      name: String::new(),
      localized_names: BTreeMap::new(),
      overview: None,
      localized_overviews: BTreeMap::new(),
      release_date: None,
      kind: self.kind,
      homepage: None,
      poster_path: None,
      backdrop_path: None,
      saved_at,
      watch_state: WatchState::default(),
      started_on: None,
      finished_on: None,
      favorite: false,
      notes: String::new(),
      custom_poster: false,
      parent_record_id: None,
      visible: true,
    };
    record.apply(self);
    record
  }

  /// A hidden stand-in for a series that is only known through one of its
  /// seasons.
  pub fn placeholder_series(catalog_id: CatalogId) -> Self {
    Self::new(catalog_id, String::new(), MediaKind::Series)
  }
}
