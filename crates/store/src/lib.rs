//! Remote store client contract
//!
//! This crate defines the primitives a hierarchical-namespace object store offers and that the
//! filesystem layer in `adls-core` builds on. The store natively supports only:
//!
//! - create/delete directory (delete is always subtree-recursive)
//! - create/delete/rename file, rename directory
//! - list every path under a prefix
//! - ranged reads
//! - the append/flush write protocol: ordered appends at increasing offsets, then a flush that
//!   commits the file at a declared total length
//!
//! ## Clients
//!
//! - [`MemoryStore`]: in-process store, used as the test double and for `memory://` mounts
//! - [`LocalStore`]: the same contract backed by a directory on disk, for `file://` mounts
//!
//! Network clients (authentication, transport, retries) live outside this workspace and plug in
//! by implementing [`RemoteStore`].
//!
//! ## Example Usage
//!
//! ```
//! use adls_store::{MemoryStore, RemoteStore};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new("test");
//! store.create_file("root/a/file.txt")?;
//! store.append_data("root/a/file.txt", 0, b"some text")?;
//! store.flush("root/a/file.txt", 9)?;
//!
//! assert_eq!(store.get_info("root/a/file.txt")?.content_length, 9);
//! # Ok(())
//! # }
//! ```

mod client;
mod local;
mod memory;
mod path_info;

pub use client::{rename_target, RemoteStore};
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use path_info::{permissions_from_mode, PathInfo, DEFAULT_GROUP, DEFAULT_OWNER};

/// Errors reported by a store client
///
/// These are the client's own failures. The filesystem layer passes them through unmodified
/// except where it deliberately suppresses them.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The path does not exist
    #[error("Path not found: {0}")]
    NotFound(String),

    /// The path already exists and the operation does not overwrite it
    #[error("Path already exists: {0}")]
    AlreadyExists(String),

    /// A file was found where a directory was expected, or the other way round
    #[error("Path conflict: {0}")]
    PathConflict(String),

    /// An append did not start where the previous one ended
    #[error("Invalid append offset for {path}: expected {expected}, got {actual}")]
    InvalidOffset {
        path: String,
        expected: u64,
        actual: u64,
    },

    /// A flush declared a length different from the bytes appended
    #[error("Invalid flush length for {path}: expected {expected}, got {actual}")]
    InvalidFlushLength {
        path: String,
        expected: u64,
        actual: u64,
    },

    /// A read range with `start > end`
    #[error("Invalid range for {path}: {start}..{end}")]
    InvalidRange { path: String, start: u64, end: u64 },

    /// A rename destination that is not `<file_system>/<path>` or points inside its source
    #[error("Invalid rename target: {0}")]
    InvalidRenameTarget(String),

    /// The path could not be normalised
    #[error("Invalid path: {0}")]
    InvalidPath(#[from] adls_types::PathError),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
