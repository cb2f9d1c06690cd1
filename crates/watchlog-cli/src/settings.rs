//! [`FileSettings`] — preferences kept in a TOML file.

use std::{
  collections::BTreeMap,
  fs,
  io::Write as _,
  path::{Path, PathBuf},
  sync::RwLock,
};

use tracing::warn;
use watchlog_core::{
  settings::{Preference, SettingValue, SettingsStore},
  Error, Result,
};

/// A flat TOML table of preferences, rewritten in full on every change.
///
/// Writes go to a temporary file in the same directory which then replaces
/// the real one, so a crash never leaves a half-written file behind.
#[derive(Debug)]
pub struct FileSettings {
  path:   PathBuf,
  values: RwLock<BTreeMap<Preference, SettingValue>>,
}

impl FileSettings {
  /// Load `path`, or start empty if it does not exist yet. Unknown keys are
  /// dropped with a warning.
  pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
    let path = path.into();
    let values = match fs::read_to_string(&path) {
      Ok(raw) => parse(&raw)?,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
      Err(e) => return Err(Error::Settings(format!("reading {}: {e}", path.display()))),
    };
    Ok(Self { path, values: RwLock::new(values) })
  }

  pub fn path(&self) -> &Path { &self.path }

  fn persist(&self, values: &BTreeMap<Preference, SettingValue>) -> Result<()> {
    let table: BTreeMap<&str, &SettingValue> = values.iter().map(|(k, v)| (k.key(), v)).collect();
    let raw = toml::to_string(&table).map_err(|e| Error::Settings(e.to_string()))?;

    let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| Error::Settings(e.to_string()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::Settings(e.to_string()))?;
    tmp
      .write_all(raw.as_bytes())
      .map_err(|e| Error::Settings(e.to_string()))?;
    tmp
      .persist(&self.path)
      .map_err(|e| Error::Settings(e.to_string()))?;
    Ok(())
  }

  /// Apply `f` to a copy, persist the copy, and only then make it current.
  fn modify(&self, f: impl FnOnce(&mut BTreeMap<Preference, SettingValue>)) -> Result<()> {
    let mut values = self
      .values
      .write()
      .map_err(|e| Error::Settings(e.to_string()))?;
    let mut next = values.clone();
    f(&mut next);
    self.persist(&next)?;
    *values = next;
    Ok(())
  }
}

fn parse(raw: &str) -> Result<BTreeMap<Preference, SettingValue>> {
  let table: BTreeMap<String, SettingValue> =
    toml::from_str(raw).map_err(|e| Error::Settings(e.to_string()))?;
  let mut values = BTreeMap::new();
  for (key, value) in table {
    match Preference::from_key(&key) {
      Ok(pref) => {
        values.insert(pref, value);
      }
      Err(_) => warn!(key = %key, "ignoring unknown setting"),
    }
  }
  Ok(values)
}

/// Interpret a command-line value: `true`/`false`, then integer, then float,
/// otherwise text.
pub fn parse_value(raw: &str) -> SettingValue {
  if let Ok(b) = raw.parse::<bool>() {
    SettingValue::Bool(b)
  } else if let Ok(i) = raw.parse::<i64>() {
    SettingValue::Int(i)
  } else if let Ok(f) = raw.parse::<f64>() {
    SettingValue::Float(f)
  } else {
    SettingValue::Text(raw.to_owned())
  }
}

impl SettingsStore for FileSettings {
  fn get(&self, key: Preference) -> Option<SettingValue> {
    self.values.read().ok()?.get(&key).cloned()
  }

  fn set(&self, key: Preference, value: SettingValue) -> Result<()> {
    self.modify(|values| {
      values.insert(key, value);
    })
  }

  fn remove(&self, key: Preference) -> Result<()> {
    self.modify(|values| {
      values.remove(&key);
    })
  }
}
