//! Schema version descriptors.
//!
//! A [`SchemaVersion`] identifies one generation of the record schema. The
//! ordering is lexicographic over `(major, minor, patch)`, which is exactly
//! what `#[derive(Ord)]` produces given the field order below.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A three-part schema generation number.
///
/// Serialised as `{"major":2,"minor":2,"patch":0}`; this is also the payload
/// of the version stamp written into backup archives.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SchemaVersion {
  pub major: u16,
  pub minor: u16,
  pub patch: u16,
}

impl SchemaVersion {
  pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
    Self { major, minor, patch }
  }

  /// Pack into the single integer SQLite keeps in `PRAGMA user_version`.
  ///
  /// Layout is `major << 16 | minor << 8 | patch`. `minor` and `patch` must
  /// fit in a byte and `major` must keep the result a positive `i32`.
  pub fn packed(self) -> Result<u32> {
    if self.major > 0x7fff || self.minor > 0xff || self.patch > 0xff {
      return Err(Error::UnpackableVersion(self));
    }
    Ok(
      (u32::from(self.major) << 16)
        | (u32::from(self.minor) << 8)
        | u32::from(self.patch),
    )
  }

  /// Inverse of [`SchemaVersion::packed`]. `0` means "no schema written yet"
  /// and yields `None`.
  pub fn from_packed(raw: u32) -> Option<Self> {
    if raw == 0 {
      return None;
    }
    Some(Self {
      major: (raw >> 16) as u16,
      minor: ((raw >> 8) & 0xff) as u16,
      patch: (raw & 0xff) as u16,
    })
  }
}

impl fmt::Display for SchemaVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
  }
}

impl FromStr for SchemaVersion {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let malformed = || Error::MalformedVersion(s.to_owned());
    let mut parts = s.trim().split('.');
    let mut next = || -> Result<u16> {
      parts
        .next()
        .ok_or_else(malformed)?
        .parse::<u16>()
        .map_err(|_| malformed())
    };
    let version = Self::new(next()?, next()?, next()?);
    if parts.next().is_some() {
      return Err(malformed());
    }
    Ok(version)
  }
}
