//! Store-file discovery by name prefix.
//!
//! SQLite keeps a store as a main file plus side files (`-wal`, `-shm`,
//! `-journal`) that share its name as a prefix; backup and restore always move
//! the whole set.

use std::{
  ffi::OsStr,
  fs, io,
  path::{Path, PathBuf},
};

use tempfile::TempDir;
use tracing::warn;

/// Regular files directly inside `dir` whose names start with `prefix`,
/// sorted by name.
pub fn matching(dir: &Path, prefix: &str) -> io::Result<Vec<PathBuf>> {
  let mut found = Vec::new();
  for entry in fs::read_dir(dir)? {
    let entry = entry?;
    if entry.file_type()?.is_file() && entry.file_name().to_string_lossy().starts_with(prefix) {
      found.push(entry.path());
    }
  }
  found.sort();
  Ok(found)
}

fn name_of(file: &Path) -> io::Result<&OsStr> {
  file
    .file_name()
    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, file.display().to_string()))
}

/// Copy `files` into `dest`, keeping their names.
pub fn copy_into(files: &[PathBuf], dest: &Path) -> io::Result<()> {
  for file in files {
    fs::copy(file, dest.join(name_of(file)?))?;
  }
  Ok(())
}

/// Delete every file in `dir` matching `prefix`. Returns how many were removed.
pub fn remove_matching(dir: &Path, prefix: &str) -> io::Result<usize> {
  let files = matching(dir, prefix)?;
  for file in &files {
    fs::remove_file(file)?;
  }
  Ok(files.len())
}

/// Store files moved out of the way while replacements are put in place.
///
/// The originals sit in a hidden directory inside the store directory, so
/// moving them there and back is a rename on the same filesystem.
/// [`SetAside::restore`] puts them back; [`SetAside::discard`] deletes them.
pub struct SetAside {
  dir:       TempDir,
  store_dir: PathBuf,
  prefix:    String,
  moved:     Vec<PathBuf>,
}

impl SetAside {
  /// Move every file in `store_dir` matching `prefix` aside. On failure the
  /// files already moved are put back.
  pub fn new(store_dir: &Path, prefix: &str) -> io::Result<Self> {
    let mut aside = Self {
      dir:       tempfile::Builder::new()
        .prefix(".watchlog-aside-")
        .tempdir_in(store_dir)?,
      store_dir: store_dir.to_path_buf(),
      prefix:    prefix.to_owned(),
      moved:     Vec::new(),
    };
    for file in matching(store_dir, prefix)? {
      let to = aside.dir.path().join(name_of(&file)?);
      if let Err(e) = fs::rename(&file, &to) {
        if let Err(undo) = aside.restore() {
          warn!(error = %undo, "could not put store files back after a failed move");
        }
        return Err(e);
      }
      aside.moved.push(to);
    }
    Ok(aside)
  }

  pub fn len(&self) -> usize { self.moved.len() }

  pub fn is_empty(&self) -> bool { self.moved.is_empty() }

  /// Remove whatever now matches the prefix in the store directory and move
  /// the originals back.
  pub fn restore(self) -> io::Result<()> {
    remove_matching(&self.store_dir, &self.prefix)?;
    for file in &self.moved {
      fs::rename(file, self.store_dir.join(name_of(file)?))?;
    }
    Ok(())
  }

  /// Delete the originals.
  pub fn discard(self) -> io::Result<()> { self.dir.close() }
}
