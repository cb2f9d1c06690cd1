//! User preferences — a flat, process-wide key → scalar table.
//!
//! Keys are the closed set [`Preference`]. Backups snapshot only the keys in
//! [`Preference::BACKED_UP`]; anything missing from that allow-list (the
//! catalog credential in particular) never leaves the device.

use std::{collections::BTreeMap, fmt, sync::RwLock};

use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoStaticStr};

use crate::{Error, Result};

// ─── Keys ────────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Preference {
  /// Locale used for catalog lookups, e.g. `"en-US"`.
  PreferredLanguage,
  IncludeAdultContent,
  LibrarySortOrder,
  HideWatched,
  ShowSeasonsInLibrary,
  AccentColor,
  /// Last time a backup was exported, RFC 3339.
  LastBackupAt,
  CatalogApiKey,
  HasCatalogApiKey,
}

impl Preference {
  /// The keys a backup may carry.
  pub const BACKED_UP: &'static [Preference] = &[
    Preference::PreferredLanguage,
    Preference::IncludeAdultContent,
    Preference::LibrarySortOrder,
    Preference::HideWatched,
    Preference::ShowSeasonsInLibrary,
    Preference::AccentColor,
    Preference::LastBackupAt,
  ];

  /// The storage key, e.g. `"preferred_language"`.
  pub fn key(self) -> &'static str { self.into() }

  pub fn is_backed_up(self) -> bool { Self::BACKED_UP.contains(&self) }

  /// Resolve a storage key back to a preference.
  pub fn from_key(key: &str) -> Result<Self> {
    key.parse().map_err(|_| Error::UnknownPreference(key.to_owned()))
  }
}

impl fmt::Display for Preference {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.key()) }
}

// ─── Values ──────────────────────────────────────────────────────────────────

/// A scalar preference value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
  Bool(bool),
  Int(i64),
  Float(f64),
  Text(String),
}

impl From<bool> for SettingValue {
  fn from(v: bool) -> Self { Self::Bool(v) }
}

impl From<i64> for SettingValue {
  fn from(v: i64) -> Self { Self::Int(v) }
}

impl From<f64> for SettingValue {
  fn from(v: f64) -> Self { Self::Float(v) }
}

impl From<&str> for SettingValue {
  fn from(v: &str) -> Self { Self::Text(v.to_owned()) }
}

impl From<String> for SettingValue {
  fn from(v: String) -> Self { Self::Text(v) }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Read/write access to the preference table.
pub trait SettingsStore: Send + Sync {
  fn get(&self, key: Preference) -> Option<SettingValue>;

  fn set(&self, key: Preference, value: SettingValue) -> Result<()>;

  fn remove(&self, key: Preference) -> Result<()>;

  /// Collect the present values of `keys` into a map keyed by storage key.
  /// Absent keys are omitted.
  fn snapshot(&self, keys: &[Preference]) -> BTreeMap<String, SettingValue> {
    keys
      .iter()
      .filter_map(|&k| self.get(k).map(|v| (k.key().to_owned(), v)))
      .collect()
  }
}

// ─── In-memory implementation ────────────────────────────────────────────────

/// A settings table that lives only as long as the process; used by tests and
/// previews.
#[derive(Debug, Default)]
pub struct MemorySettings {
  values: RwLock<BTreeMap<Preference, SettingValue>>,
}

impl MemorySettings {
  pub fn new() -> Self { Self::default() }
}

impl SettingsStore for MemorySettings {
  fn get(&self, key: Preference) -> Option<SettingValue> {
    self.values.read().ok()?.get(&key).cloned()
  }

  fn set(&self, key: Preference, value: SettingValue) -> Result<()> {
    self
      .values
      .write()
      .map_err(|e| Error::Settings(e.to_string()))?
      .insert(key, value);
    Ok(())
  }

  fn remove(&self, key: Preference) -> Result<()> {
    self
      .values
      .write()
      .map_err(|e| Error::Settings(e.to_string()))?
      .remove(&key);
    Ok(())
  }
}
