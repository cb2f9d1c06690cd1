//! Generation 2.2.0: localized names and overviews. Current.
//!
//! Both maps are JSON objects (locale code → text); rows migrated from 2.1.0
//! start with empty maps.

use watchlog_core::version::SchemaVersion;

pub const VERSION: SchemaVersion = SchemaVersion::new(2, 2, 0);

pub const UPGRADE_DDL: &str = "
ALTER TABLE media ADD COLUMN localized_names     TEXT NOT NULL DEFAULT '{}';
ALTER TABLE media ADD COLUMN localized_overviews TEXT NOT NULL DEFAULT '{}';
";

/// Creates a store directly at this generation. The resulting table is
/// column-for-column identical to one migrated up from 1.0.0.
pub const CURRENT_DDL: &str = "
CREATE TABLE IF NOT EXISTS media (
    record_id           TEXT PRIMARY KEY,
    catalog_id          INTEGER NOT NULL UNIQUE,
    name                TEXT NOT NULL,
    overview            TEXT,
    release_date        TEXT,
    homepage            TEXT,
    poster_path         TEXT,
    backdrop_path       TEXT,
    saved_at            TEXT NOT NULL,
    favorite            INTEGER NOT NULL DEFAULT 0,
    notes               TEXT NOT NULL DEFAULT '',
    kind                TEXT NOT NULL,
    watch_state         TEXT NOT NULL DEFAULT 'plan_to_watch',
    started_on          TEXT,
    finished_on         TEXT,
    custom_poster       INTEGER NOT NULL DEFAULT 0,
    parent_record_id    TEXT,
    visible             INTEGER NOT NULL DEFAULT 1,
    localized_names     TEXT NOT NULL DEFAULT '{}',
    localized_overviews TEXT NOT NULL DEFAULT '{}'
);

CREATE INDEX IF NOT EXISTS media_saved_idx ON media(saved_at);
";
