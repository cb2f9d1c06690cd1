//! SQLite backend for the Watchlog record store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! background thread, one request at a time, without blocking the async
//! runtime. Opening a store walks the [`migrate::MigrationPlan`] before the
//! handle is handed out, so callers only ever see the current generation.

mod encode;
mod store;

pub mod error;
pub mod generations;
pub mod manager;
pub mod migrate;

pub use error::{Error, Result};
pub use manager::{StoreLocation, StoreManager};
pub use migrate::{MigrationPlan, MigrationReport};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
