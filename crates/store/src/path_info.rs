//! Snapshot of a single remote entry.

use chrono::{DateTime, Utc};

/// Owner reported for entries created by the reference clients.
pub const DEFAULT_OWNER: &str = "$superuser";

/// Group reported for entries created by the reference clients.
pub const DEFAULT_GROUP: &str = "$superuser";

/// Immutable description of one remote path, as returned by `get_info` and `list_paths`.
///
/// `content_length` is only meaningful when `is_directory` is false; directories report 0.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PathInfo {
    /// Full store-relative path, slash-separated
    pub name: String,

    pub is_directory: bool,

    /// Committed length in bytes
    pub content_length: u64,

    pub last_modified: DateTime<Utc>,

    pub owner: String,

    pub group: String,

    /// Nine-character `rwx` string, e.g. `rw-r-----`
    pub permissions: String,

    /// Opaque version token, changes on every committed write
    pub etag: String,
}

impl PathInfo {
    pub fn is_file(&self) -> bool {
        !self.is_directory
    }
}

/// Formats the low nine permission bits of `mode` as an `rwx` string.
///
/// ```
/// assert_eq!(adls_store::permissions_from_mode(0o640), "rw-r-----");
/// assert_eq!(adls_store::permissions_from_mode(0o40750), "rwxr-x---");
/// ```
pub fn permissions_from_mode(mode: u32) -> String {
    const FLAGS: [(u32, char); 9] = [
        (0o400, 'r'),
        (0o200, 'w'),
        (0o100, 'x'),
        (0o040, 'r'),
        (0o020, 'w'),
        (0o010, 'x'),
        (0o004, 'r'),
        (0o002, 'w'),
        (0o001, 'x'),
    ];

    FLAGS
        .iter()
        .map(|&(bit, ch)| if mode & bit != 0 { ch } else { '-' })
        .collect()
}
