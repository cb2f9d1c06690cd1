//! The migration plan: walking a store from its on-disk generation to the
//! newest one this build knows.
//!
//! The on-disk generation lives in `PRAGMA user_version` (see
//! [`SchemaVersion::packed`]). Every stage runs inside a single transaction
//! together with the `user_version` bump, so a store is always exactly at one
//! generation of the registry; a process killed mid-stage rolls back to the
//! stage's source and simply runs it again on next open.

use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use tracing::info;
use watchlog_core::version::SchemaVersion;

use crate::{
  generations::{self, GENERATIONS, MEDIA},
  Error, Result,
};

// ─── Registry types ──────────────────────────────────────────────────────────

/// One entry of the generation registry.
#[derive(Debug)]
pub struct Generation {
  pub version:      SchemaVersion,
  /// Record types (tables) defined at this generation.
  pub record_types: &'static [&'static str],
  /// How a store at the previous generation becomes this one. `None` only for
  /// the oldest generation.
  pub upgrade:      Option<StageKind>,
}

#[derive(Debug)]
pub enum StageKind {
  /// Structural change only; new columns get their declared defaults.
  Lightweight { ddl: &'static str },
  /// Explicit read → transform → write logic.
  Custom(CustomStage),
}

#[derive(Debug)]
pub struct CustomStage {
  pub description: &'static str,
  /// Runs both halves of the migration; returns the number of rows written.
  pub run:         fn(&Connection) -> Result<usize>,
}

/// A data transform between two adjacent generations.
///
/// The stage is split the same way for every custom migration: the first
/// half leaves the table empty and in the target shape, the second half fills
/// it. Both halves run inside the stage transaction.
pub trait CustomMigration {
  type Target;

  /// Read every source row, compute its target row, then drop the source rows
  /// and reshape the table.
  ///
  /// Must return no rows and leave the table alone when the source shape is
  /// already gone.
  fn will_migrate(conn: &Connection) -> Result<Vec<Self::Target>>;

  /// Write the target rows. Writes are upserts keyed on the catalog ID, so
  /// repeating this step converges instead of duplicating.
  fn did_migrate(conn: &Connection, rows: Vec<Self::Target>) -> Result<usize>;
}

/// Adapter from a [`CustomMigration`] to [`CustomStage::run`].
pub fn run_custom<M: CustomMigration>(conn: &Connection) -> Result<usize> {
  let rows = M::will_migrate(conn)?;
  M::did_migrate(conn, rows)
}

/// A transition between two adjacent generations.
#[derive(Debug, Clone, Copy)]
pub struct MigrationStage<'a> {
  pub source: SchemaVersion,
  pub target: SchemaVersion,
  pub kind:   &'a StageKind,
}

// ─── Report ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedStage {
  pub source: SchemaVersion,
  pub target: SchemaVersion,
  pub custom: bool,
  /// Rows written by a custom stage.
  pub rows:   Option<usize>,
}

/// What opening a store did to its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
  /// Generation found on disk; `None` for a brand-new store.
  pub from:    Option<SchemaVersion>,
  pub to:      SchemaVersion,
  /// The schema was created from scratch.
  pub created: bool,
  pub stages:  Vec<AppliedStage>,
}

impl MigrationReport {
  pub fn is_noop(&self) -> bool { !self.created && self.stages.is_empty() }
}

// ─── Plan ────────────────────────────────────────────────────────────────────

/// The ordered chain of stages from the oldest supported generation to the
/// newest.
#[derive(Debug, Clone, Copy)]
pub struct MigrationPlan {
  generations: &'static [Generation],
  /// Creates the oldest generation from nothing.
  base_ddl:    &'static str,
  /// Creates the newest generation from nothing.
  current_ddl: &'static str,
}

impl MigrationPlan {
  /// The plan compiled into this build.
  pub fn current() -> Self {
    Self {
      generations: GENERATIONS,
      base_ddl:    generations::v1_0::DDL,
      current_ddl: generations::v2_2::CURRENT_DDL,
    }
  }

  /// Build a plan over an arbitrary registry, checking that versions are
  /// strictly increasing and that every generation but the first has a stage.
  pub fn new(
    generations: &'static [Generation],
    base_ddl: &'static str,
    current_ddl: &'static str,
  ) -> Result<Self> {
    let first = generations
      .first()
      .ok_or(Error::BrokenChain(SchemaVersion::new(0, 0, 0)))?;
    if first.upgrade.is_some() {
      return Err(Error::BrokenChain(first.version));
    }
    for pair in generations.windows(2) {
      let (prev, next) = (&pair[0], &pair[1]);
      if next.version <= prev.version || next.upgrade.is_none() {
        return Err(Error::BrokenChain(next.version));
      }
    }
    for generation in generations {
      generation.version.packed()?;
    }
    Ok(Self { generations, base_ddl, current_ddl })
  }

  pub fn generations(&self) -> &'static [Generation] { self.generations }

  pub fn oldest(&self) -> SchemaVersion {
    self.generations.first().map_or(SchemaVersion::new(0, 0, 0), |g| g.version)
  }

  pub fn newest(&self) -> SchemaVersion {
    self.generations.last().map_or(SchemaVersion::new(0, 0, 0), |g| g.version)
  }

  /// Every stage in chain order.
  pub fn stages(&self) -> impl Iterator<Item = MigrationStage<'static>> + 'static {
    self.generations.windows(2).filter_map(|pair| {
      pair[1].upgrade.as_ref().map(|kind| MigrationStage {
        source: pair[0].version,
        target: pair[1].version,
        kind,
      })
    })
  }

  /// Generations a store at `on_disk` still has to pass through.
  pub fn pending(&self, on_disk: SchemaVersion) -> &'static [Generation] {
    let start = self.generations.partition_point(|g| g.version <= on_disk);
    &self.generations[start..]
  }

  /// Read the generation recorded in the store header.
  pub fn on_disk_version(conn: &Connection) -> Result<Option<SchemaVersion>> {
    Ok(SchemaVersion::from_packed(read_tag(conn)?))
  }

  /// Whether a store in this state could be opened by this plan, without
  /// changing it: either no schema at all, or a registered generation no newer
  /// than the newest. Returns the generation found.
  pub fn check(&self, conn: &Connection) -> Result<Option<SchemaVersion>> {
    let tag = read_tag(conn)?;
    let newest = self.newest();
    match SchemaVersion::from_packed(tag) {
      None if generations::table_exists(conn, MEDIA)? => Err(Error::UnknownGeneration(tag)),
      None => Ok(None),
      Some(on_disk) if on_disk > newest => Err(Error::StoreTooNew { on_disk, newest }),
      Some(on_disk) if !self.knows(on_disk) => Err(Error::UnknownGeneration(tag)),
      Some(on_disk) => Ok(Some(on_disk)),
    }
  }

  /// [`MigrationPlan::check`] against an existing store file. The file is
  /// never created.
  pub fn check_file(&self, path: &Path) -> Result<Option<SchemaVersion>> {
    let conn = Connection::open_with_flags(
      path,
      OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    self.check(&conn)
  }

  /// Bring the store up to the newest generation.
  pub fn apply(&self, conn: &mut Connection) -> Result<MigrationReport> {
    self.apply_until(conn, self.newest())
  }

  /// Bring the store up to `target`, which must be a registered generation.
  ///
  /// A brand-new store is created directly at `target` when that is the
  /// newest generation, otherwise at the oldest generation and migrated up.
  pub fn apply_until(
    &self,
    conn: &mut Connection,
    target: SchemaVersion,
  ) -> Result<MigrationReport> {
    if !self.knows(target) {
      return Err(Error::UnknownGeneration(target.packed()?));
    }

    let tag = read_tag(conn)?;
    let mut report = MigrationReport {
      from:    SchemaVersion::from_packed(tag),
      to:      target,
      created: false,
      stages:  Vec::new(),
    };

    let from = match report.from {
      Some(version) => version,
      None if generations::table_exists(conn, MEDIA)? => {
        return Err(Error::UnknownGeneration(tag));
      }
      None => {
        let (ddl, version) = if target == self.newest() {
          (self.current_ddl, target)
        } else {
          (self.base_ddl, self.oldest())
        };
        let tx = conn.transaction()?;
        tx.execute_batch(ddl)?;
        tx.pragma_update(None, "user_version", version.packed()?)?;
        tx.commit()?;
        info!(%version, "created store schema");
        report.created = true;
        version
      }
    };

    let newest = self.newest();
    if from > newest {
      return Err(Error::StoreTooNew { on_disk: from, newest });
    }
    if !self.knows(from) {
      return Err(Error::UnknownGeneration(tag));
    }

    let mut source = from;
    for generation in self.pending(from).iter().take_while(|g| g.version <= target) {
      let stage = generation
        .upgrade
        .as_ref()
        .ok_or(Error::BrokenChain(generation.version))?;

      let description = match stage {
        StageKind::Lightweight { .. } => "structural change",
        StageKind::Custom(custom) => custom.description,
      };

      let tx = conn.transaction()?;
      let rows = match stage {
        StageKind::Lightweight { ddl } => {
          tx.execute_batch(ddl)?;
          None
        }
        StageKind::Custom(custom) => Some((custom.run)(&tx)?),
      };
      tx.pragma_update(None, "user_version", generation.version.packed()?)?;
      tx.commit()?;

      info!(
        %source,
        target = %generation.version,
        custom = rows.is_some(),
        rows = rows.unwrap_or(0),
        description,
        "applied migration stage"
      );

      report.stages.push(AppliedStage {
        source,
        target: generation.version,
        custom: rows.is_some(),
        rows,
      });
      source = generation.version;
    }

    Ok(report)
  }

  fn knows(&self, version: SchemaVersion) -> bool {
    self.generations.iter().any(|g| g.version == version)
  }
}

fn read_tag(conn: &Connection) -> Result<u32> {
  Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}
