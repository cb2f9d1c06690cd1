//! Core types and trait definitions for the Watchlog media library.
//!
//! This crate is deliberately free of database and filesystem dependencies.
//! The SQLite backend, the backup subsystem and the host binary all depend on
//! it; it depends on nothing proprietary.

pub mod error;
pub mod record;
pub mod settings;
pub mod store;
pub mod version;

pub use error::{Error, Result};
