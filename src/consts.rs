//! Project-wide constants.

use std::path::PathBuf;

/// Value of the `info` field on every callback envelope.
pub const ENVELOPE_INFO: &str = "storage-engine";

/// Database version used when the caller does not ask for one.
pub const DEFAULT_VERSION: u32 = 1;

/// Records per page for paginated scans when no size is given.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// File extension for databases stored on disk.
pub const DATABASE_FILE_EXTENSION: &str = "sqlite3";

/// Default on-disk location: `<data dir>/storefront`.
/// `None` when the platform has no data directory.
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("storefront"))
}
