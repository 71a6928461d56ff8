//! Facade defaults and engine placement.
//!
//! [`Config`] carries the values the facade fills in when a caller leaves
//! them out. [`SqliteConfig`] decides where [`SqliteEngine`](crate::engine::sqlite::SqliteEngine)
//! keeps its databases.

use std::path::PathBuf;

use crate::consts::{DEFAULT_PAGE_SIZE, DEFAULT_VERSION, default_data_dir};

/// Defaults applied by [`Store`](crate::store::Store) and its connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Version requested by `open` when the caller passes `None`.
    pub default_version: u32,
    /// Page size used by [`Connection::page`](crate::store::Connection::page).
    pub default_page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_version: DEFAULT_VERSION,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Where SQLite databases live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Named in-memory databases, kept alive by the engine until deleted.
    Memory,
    /// One `<name>.sqlite3` file per database inside this directory.
    Directory(PathBuf),
}

/// Configuration for the SQLite engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteConfig {
    pub location: Location,
}

impl SqliteConfig {
    /// Ephemeral databases. Use this for tests.
    pub fn in_memory() -> Self {
        Self {
            location: Location::Memory,
        }
    }

    /// Databases stored as files under `dir`.
    pub fn directory(dir: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::Directory(dir.into()),
        }
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        match default_data_dir() {
            Some(dir) => Self::directory(dir),
            None => Self::in_memory(),
        }
    }
}
