//! Zip codec for backup archives. Blocking; callers run it on the blocking
//! pool.

use std::{
  fs::{self, File},
  io,
  path::Path,
};

use thiserror::Error;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipArchive, ZipWriter};

#[derive(Debug, Error)]
pub enum ArchiveError {
  #[error("i/o error: {0}")]
  Io(#[from] io::Error),

  #[error("zip error: {0}")]
  Zip(#[from] zip::result::ZipError),

  #[error("entry {0:?} escapes the extraction directory")]
  UnsafeEntry(String),
}

/// Zip the regular files of `root` under a top-level folder named after
/// `root` itself. Returns the number of files written.
pub fn pack(root: &Path, out: &Path) -> Result<usize, ArchiveError> {
  let folder = root
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .ok_or_else(|| ArchiveError::UnsafeEntry(root.display().to_string()))?;

  let mut entries = fs::read_dir(root)?.collect::<io::Result<Vec<_>>>()?;
  entries.sort_by_key(|e| e.file_name());

  let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
  let mut zip = ZipWriter::new(File::create(out)?);
  zip.add_directory(format!("{folder}/"), options)?;

  let mut count = 0;
  for entry in entries {
    if !entry.file_type()?.is_file() {
      continue;
    }
    let name = entry.file_name().to_string_lossy().into_owned();
    zip.start_file(format!("{folder}/{name}"), options)?;
    io::copy(&mut File::open(entry.path())?, &mut zip)?;
    count += 1;
  }
  zip.finish()?;
  Ok(count)
}

/// Extract every entry of `archive` into `dest`, refusing entries whose path
/// would land outside it. Returns the number of files written.
pub fn unpack(archive: &Path, dest: &Path) -> Result<usize, ArchiveError> {
  let mut zip = ZipArchive::new(File::open(archive)?)?;
  let mut count = 0;

  for i in 0..zip.len() {
    let mut entry = zip.by_index(i)?;
    let relative = entry
      .enclosed_name()
      .ok_or_else(|| ArchiveError::UnsafeEntry(entry.name().to_owned()))?;
    let path = dest.join(relative);

    if entry.is_dir() {
      fs::create_dir_all(&path)?;
      continue;
    }
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }
    io::copy(&mut entry, &mut File::create(&path)?)?;
    count += 1;
  }
  Ok(count)
}
