//! The primitives offered by a hierarchical-namespace object store.

use crate::{PathInfo, StoreError, StoreResult};
use adls_types::StorePath;

/// Client for one container ("file system") of a hierarchical-namespace object store.
///
/// All paths are container-relative and slash-separated, without a leading slash. Rename
/// destinations are the exception: they are expressed as `"<file_system>/<path>"`.
///
/// Every call blocks until the store answers. Implementations own their own retries and
/// timeouts; callers never retry.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`. Methods take `&self`; clients that keep state use
/// interior mutability.
pub trait RemoteStore: Send + Sync {
    /// Creates a directory and any missing intermediate directories.
    ///
    /// Creating a directory that already exists succeeds.
    fn create_directory(&self, path: &str) -> StoreResult<()>;

    /// Deletes a directory together with everything below it.
    fn delete_directory(&self, path: &str) -> StoreResult<()>;

    /// Creates a new zero-length file, truncating any file already at `path`.
    fn create_file(&self, path: &str) -> StoreResult<PathInfo>;

    fn delete_file(&self, path: &str) -> StoreResult<()>;

    /// Renames a file. `new_name` is `"<file_system>/<path>"`.
    fn rename_file(&self, path: &str, new_name: &str) -> StoreResult<()>;

    /// Renames a directory and its whole subtree. `new_name` is `"<file_system>/<path>"`.
    fn rename_directory(&self, path: &str, new_name: &str) -> StoreResult<()>;

    /// Lists every path below `prefix`, recursively.
    ///
    /// A prefix naming a file yields that file alone. A missing prefix is `NotFound`.
    fn list_paths(&self, prefix: &str) -> StoreResult<Vec<PathInfo>>;

    /// Reads committed bytes `[start, end)`. The range is clamped to the file length.
    fn read_range(&self, path: &str, start: u64, end: u64) -> StoreResult<Vec<u8>>;

    /// Stages `data` at `offset`, which must equal the number of bytes already staged.
    fn append_data(&self, path: &str, offset: u64, data: &[u8]) -> StoreResult<()>;

    /// Commits staged data; `total_length` must equal the full staged length.
    fn flush(&self, path: &str, total_length: u64) -> StoreResult<()>;

    /// Point lookup of a single path.
    fn get_info(&self, path: &str) -> StoreResult<PathInfo>;
}

/// Parses a `"<file_system>/<path>"` rename destination for a client bound to `file_system`.
///
/// # Errors
///
/// Returns [`StoreError::InvalidRenameTarget`] if the destination names another file system or
/// has no path part.
pub fn rename_target(file_system: &str, new_name: &str) -> StoreResult<StorePath> {
    let trimmed = new_name.trim_start_matches('/');
    let (container, rest) = trimmed
        .split_once('/')
        .ok_or_else(|| StoreError::InvalidRenameTarget(new_name.to_owned()))?;

    if container != file_system {
        return Err(StoreError::InvalidRenameTarget(format!(
            "{new_name} (cross file system renames are not supported)"
        )));
    }

    let target = StorePath::parse(rest)?;
    if target.is_root() {
        return Err(StoreError::InvalidRenameTarget(new_name.to_owned()));
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rename_target_strips_file_system() {
        let target = rename_target("test", "test/root/b.txt").unwrap();
        assert_eq!(target.as_str(), "root/b.txt");
    }

    #[test]
    fn test_rename_target_rejects_other_file_system() {
        assert!(matches!(
            rename_target("test", "other/root/b.txt"),
            Err(StoreError::InvalidRenameTarget(_))
        ));
        assert!(matches!(
            rename_target("test", "test"),
            Err(StoreError::InvalidRenameTarget(_))
        ));
        assert!(matches!(
            rename_target("test", "test/"),
            Err(StoreError::InvalidRenameTarget(_))
        ));
    }
}
