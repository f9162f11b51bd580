//! In-process store
//!
//! [`MemoryStore`] keeps the whole namespace in a `BTreeMap` keyed by normalised path. It follows
//! the same rules a hierarchical-namespace service enforces:
//!
//! - directories are real entries; creating a file or directory creates missing parents
//! - appended bytes stay invisible until a flush commits them at the declared length
//! - directory delete and rename act on the whole subtree
//! - every mutation, renames included, assigns a fresh etag

use crate::client::rename_target;
use crate::path_info::{DEFAULT_GROUP, DEFAULT_OWNER};
use crate::{PathInfo, RemoteStore, StoreError, StoreResult};
use adls_types::StorePath;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

const FILE_PERMISSIONS: &str = "rw-r-----";
const DIRECTORY_PERMISSIONS: &str = "rwxr-x---";

#[derive(Debug, Clone)]
enum NodeKind {
    Directory,
    File {
        /// Bytes visible to readers
        committed: Vec<u8>,
        /// Appended since the last flush
        staged: Vec<u8>,
    },
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    last_modified: DateTime<Utc>,
    etag: String,
}

impl Node {
    fn directory() -> Self {
        Self {
            kind: NodeKind::Directory,
            last_modified: Utc::now(),
            etag: new_etag(),
        }
    }

    fn empty_file() -> Self {
        Self {
            kind: NodeKind::File {
                committed: Vec::new(),
                staged: Vec::new(),
            },
            last_modified: Utc::now(),
            etag: new_etag(),
        }
    }

    fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory)
    }

    fn info(&self, path: &StorePath) -> PathInfo {
        let (is_directory, content_length, permissions) = match &self.kind {
            NodeKind::Directory => (true, 0, DIRECTORY_PERMISSIONS),
            NodeKind::File { committed, .. } => (false, committed.len() as u64, FILE_PERMISSIONS),
        };

        PathInfo {
            name: path.to_string(),
            is_directory,
            content_length,
            last_modified: self.last_modified,
            owner: DEFAULT_OWNER.to_owned(),
            group: DEFAULT_GROUP.to_owned(),
            permissions: permissions.to_owned(),
            etag: self.etag.clone(),
        }
    }
}

fn new_etag() -> String {
    format!(
        "0x{}",
        uuid::Uuid::new_v4().simple().to_string().to_uppercase()
    )
}

/// In-memory [`RemoteStore`] for one file system.
#[derive(Debug)]
pub struct MemoryStore {
    file_system: String,
    nodes: Mutex<BTreeMap<StorePath, Node>>,
}

impl MemoryStore {
    /// Creates an empty store for the file system named `file_system`.
    pub fn new(file_system: impl Into<String>) -> Self {
        Self {
            file_system: file_system.into(),
            nodes: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn file_system(&self) -> &str {
        &self.file_system
    }

    fn nodes(&self) -> MutexGuard<'_, BTreeMap<StorePath, Node>> {
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn root_info() -> PathInfo {
        Node::directory().info(&StorePath::root())
    }
}

/// Creates every missing ancestor of `path` as a directory.
fn ensure_parents(nodes: &mut BTreeMap<StorePath, Node>, path: &StorePath) -> StoreResult<()> {
    for ancestor in path.ancestors() {
        match nodes.get(&ancestor) {
            Some(node) if !node.is_directory() => {
                return Err(StoreError::PathConflict(format!(
                    "{ancestor} is a file, cannot create {path} below it"
                )));
            }
            Some(_) => {}
            None => {
                nodes.insert(ancestor, Node::directory());
            }
        }
    }
    Ok(())
}

/// Fails unless the parent of `path` exists as a directory.
fn require_parent(nodes: &BTreeMap<StorePath, Node>, path: &StorePath) -> StoreResult<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.is_root() {
        return Ok(());
    }
    match nodes.get(&parent) {
        Some(node) if node.is_directory() => Ok(()),
        Some(_) => Err(StoreError::PathConflict(format!("{parent} is not a directory"))),
        None => Err(StoreError::NotFound(parent.to_string())),
    }
}

impl RemoteStore for MemoryStore {
    fn create_directory(&self, path: &str) -> StoreResult<()> {
        let path = StorePath::parse(path)?;
        if path.is_root() {
            return Ok(());
        }

        let mut nodes = self.nodes();
        ensure_parents(&mut nodes, &path)?;
        match nodes.get(&path) {
            Some(node) if node.is_directory() => Ok(()),
            Some(_) => Err(StoreError::AlreadyExists(path.to_string())),
            None => {
                nodes.insert(path, Node::directory());
                Ok(())
            }
        }
    }

    fn delete_directory(&self, path: &str) -> StoreResult<()> {
        let path = StorePath::parse(path)?;
        if path.is_root() {
            return Err(StoreError::PathConflict(
                "the file system root cannot be deleted".into(),
            ));
        }

        let mut nodes = self.nodes();
        match nodes.get(&path) {
            None => return Err(StoreError::NotFound(path.to_string())),
            Some(node) if !node.is_directory() => {
                return Err(StoreError::PathConflict(format!("{path} is a file")));
            }
            Some(_) => {}
        }
        nodes.retain(|key, _| !key.starts_with(&path));
        Ok(())
    }

    fn create_file(&self, path: &str) -> StoreResult<PathInfo> {
        let path = StorePath::parse(path)?;
        if path.is_root() {
            return Err(StoreError::PathConflict("the file system root is a directory".into()));
        }

        let mut nodes = self.nodes();
        if nodes.get(&path).is_some_and(Node::is_directory) {
            return Err(StoreError::PathConflict(format!("{path} is a directory")));
        }
        ensure_parents(&mut nodes, &path)?;

        let node = Node::empty_file();
        let info = node.info(&path);
        nodes.insert(path, node);
        Ok(info)
    }

    fn delete_file(&self, path: &str) -> StoreResult<()> {
        let path = StorePath::parse(path)?;
        let mut nodes = self.nodes();
        match nodes.get(&path) {
            None => Err(StoreError::NotFound(path.to_string())),
            Some(node) if node.is_directory() => {
                Err(StoreError::PathConflict(format!("{path} is a directory")))
            }
            Some(_) => {
                nodes.remove(&path);
                Ok(())
            }
        }
    }

    fn rename_file(&self, path: &str, new_name: &str) -> StoreResult<()> {
        let source = StorePath::parse(path)?;
        let target = rename_target(&self.file_system, new_name)?;

        let mut nodes = self.nodes();
        match nodes.get(&source) {
            None => return Err(StoreError::NotFound(source.to_string())),
            Some(node) if node.is_directory() => {
                return Err(StoreError::PathConflict(format!("{source} is a directory")));
            }
            Some(_) => {}
        }
        require_parent(&nodes, &target)?;
        if nodes.get(&target).is_some_and(Node::is_directory) {
            return Err(StoreError::PathConflict(format!("{target} is a directory")));
        }

        if let Some(mut node) = nodes.remove(&source) {
            node.etag = new_etag();
            nodes.insert(target, node);
        }
        Ok(())
    }

    fn rename_directory(&self, path: &str, new_name: &str) -> StoreResult<()> {
        let source = StorePath::parse(path)?;
        let target = rename_target(&self.file_system, new_name)?;
        if source.is_root() {
            return Err(StoreError::PathConflict(
                "the file system root cannot be renamed".into(),
            ));
        }
        if target.starts_with(&source) {
            return Err(StoreError::InvalidRenameTarget(format!(
                "{target} is inside {source}"
            )));
        }

        let mut nodes = self.nodes();
        match nodes.get(&source) {
            None => return Err(StoreError::NotFound(source.to_string())),
            Some(node) if !node.is_directory() => {
                return Err(StoreError::PathConflict(format!("{source} is a file")));
            }
            Some(_) => {}
        }
        require_parent(&nodes, &target)?;
        if nodes.contains_key(&target) {
            return Err(StoreError::AlreadyExists(target.to_string()));
        }

        let moved: Vec<StorePath> = nodes
            .keys()
            .filter(|key| key.starts_with(&source))
            .cloned()
            .collect();
        for old in moved {
            let Some(suffix) = old.strip_prefix(&source) else {
                continue;
            };
            let new = target.join(suffix)?;
            if let Some(mut node) = nodes.remove(&old) {
                node.etag = new_etag();
                nodes.insert(new, node);
            }
        }
        Ok(())
    }

    fn list_paths(&self, prefix: &str) -> StoreResult<Vec<PathInfo>> {
        let prefix = StorePath::parse(prefix)?;
        let nodes = self.nodes();

        if !prefix.is_root() {
            match nodes.get(&prefix) {
                None => return Err(StoreError::NotFound(prefix.to_string())),
                Some(node) if !node.is_directory() => return Ok(vec![node.info(&prefix)]),
                Some(_) => {}
            }
        }

        Ok(nodes
            .iter()
            .filter(|(key, _)| **key != prefix && key.starts_with(&prefix))
            .map(|(key, node)| node.info(key))
            .collect())
    }

    fn read_range(&self, path: &str, start: u64, end: u64) -> StoreResult<Vec<u8>> {
        let path = StorePath::parse(path)?;
        if start > end {
            return Err(StoreError::InvalidRange {
                path: path.to_string(),
                start,
                end,
            });
        }

        let nodes = self.nodes();
        let node = nodes
            .get(&path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        let NodeKind::File { committed, .. } = &node.kind else {
            return Err(StoreError::PathConflict(format!("{path} is a directory")));
        };

        let len = committed.len() as u64;
        let start = start.min(len) as usize;
        let end = end.min(len) as usize;
        Ok(committed[start..end].to_vec())
    }

    fn append_data(&self, path: &str, offset: u64, data: &[u8]) -> StoreResult<()> {
        let path = StorePath::parse(path)?;
        let mut nodes = self.nodes();
        let node = nodes
            .get_mut(&path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        let NodeKind::File { committed, staged } = &mut node.kind else {
            return Err(StoreError::PathConflict(format!("{path} is a directory")));
        };

        let expected = (committed.len() + staged.len()) as u64;
        if offset != expected {
            return Err(StoreError::InvalidOffset {
                path: path.to_string(),
                expected,
                actual: offset,
            });
        }
        staged.extend_from_slice(data);
        Ok(())
    }

    fn flush(&self, path: &str, total_length: u64) -> StoreResult<()> {
        let path = StorePath::parse(path)?;
        let mut nodes = self.nodes();
        let node = nodes
            .get_mut(&path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        let NodeKind::File { committed, staged } = &mut node.kind else {
            return Err(StoreError::PathConflict(format!("{path} is a directory")));
        };

        let expected = (committed.len() + staged.len()) as u64;
        if total_length != expected {
            return Err(StoreError::InvalidFlushLength {
                path: path.to_string(),
                expected,
                actual: total_length,
            });
        }
        committed.append(staged);
        node.last_modified = Utc::now();
        node.etag = new_etag();
        Ok(())
    }

    fn get_info(&self, path: &str) -> StoreResult<PathInfo> {
        let path = StorePath::parse(path)?;
        if path.is_root() {
            return Ok(Self::root_info());
        }
        let nodes = self.nodes();
        nodes
            .get(&path)
            .map(|node| node.info(&path))
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(store: &MemoryStore, path: &str, data: &[u8]) {
        store.create_file(path).unwrap();
        store.append_data(path, 0, data).unwrap();
        store.flush(path, data.len() as u64).unwrap();
    }

    fn names(infos: &[PathInfo]) -> Vec<&str> {
        infos.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn test_create_file_creates_parents() {
        let store = MemoryStore::new("test");
        write_file(&store, "root/a/file.txt", b"some text");

        let parent = store.get_info("root/a").unwrap();
        assert!(parent.is_directory);
        assert_eq!(parent.permissions, DIRECTORY_PERMISSIONS);

        let file = store.get_info("root/a/file.txt").unwrap();
        assert!(file.is_file());
        assert_eq!(file.content_length, 9);
        assert_eq!(file.permissions, FILE_PERMISSIONS);
        assert_eq!(file.owner, DEFAULT_OWNER);
    }

    #[test]
    fn test_create_directory_is_idempotent() {
        let store = MemoryStore::new("test");
        store.create_directory("root/empty_dir").unwrap();
        store.create_directory("root/empty_dir").unwrap();
        assert!(store.get_info("root").unwrap().is_directory);
    }

    #[test]
    fn test_create_directory_over_file_fails() {
        let store = MemoryStore::new("test");
        write_file(&store, "root/file.txt", b"x");
        assert!(matches!(
            store.create_directory("root/file.txt"),
            Err(StoreError::AlreadyExists(_))
        ));
        assert!(matches!(
            store.create_directory("root/file.txt/nested"),
            Err(StoreError::PathConflict(_))
        ));
    }

    #[test]
    fn test_staged_bytes_invisible_until_flush() {
        let store = MemoryStore::new("test");
        store.create_file("f").unwrap();
        store.append_data("f", 0, b"abc").unwrap();
        store.append_data("f", 3, b"def").unwrap();

        assert_eq!(store.get_info("f").unwrap().content_length, 0);
        assert!(store.read_range("f", 0, 6).unwrap().is_empty());

        let before = store.get_info("f").unwrap().etag;
        store.flush("f", 6).unwrap();
        let after = store.get_info("f").unwrap();
        assert_eq!(after.content_length, 6);
        assert_ne!(before, after.etag);
        assert_eq!(store.read_range("f", 2, 5).unwrap(), b"cde");
    }

    #[test]
    fn test_rename_assigns_fresh_etags() {
        let store = MemoryStore::new("test");
        store.create_directory("d/sub").unwrap();
        store.create_file("d/sub/f").unwrap();
        store.create_file("g").unwrap();
        let dir_before = store.get_info("d").unwrap().etag;
        let nested_before = store.get_info("d/sub/f").unwrap().etag;
        let file_before = store.get_info("g").unwrap().etag;

        store.rename_directory("d", "test/e").unwrap();
        store.rename_file("g", "test/h").unwrap();

        assert_ne!(store.get_info("e").unwrap().etag, dir_before);
        assert_ne!(store.get_info("e/sub/f").unwrap().etag, nested_before);
        assert_ne!(store.get_info("h").unwrap().etag, file_before);
    }

    #[test]
    fn test_append_offset_must_be_contiguous() {
        let store = MemoryStore::new("test");
        store.create_file("f").unwrap();
        store.append_data("f", 0, b"abc").unwrap();

        let err = store.append_data("f", 2, b"x").unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidOffset {
                expected: 3,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_flush_length_must_match() {
        let store = MemoryStore::new("test");
        store.create_file("f").unwrap();
        store.append_data("f", 0, b"abc").unwrap();
        assert!(matches!(
            store.flush("f", 2),
            Err(StoreError::InvalidFlushLength { expected: 3, .. })
        ));
    }

    #[test]
    fn test_create_file_truncates() {
        let store = MemoryStore::new("test");
        write_file(&store, "f", b"old content");
        store.create_file("f").unwrap();
        assert_eq!(store.get_info("f").unwrap().content_length, 0);
    }

    #[test]
    fn test_read_range_clamps_to_length() {
        let store = MemoryStore::new("test");
        write_file(&store, "f", b"data");
        assert_eq!(store.read_range("f", 2, 100).unwrap(), b"ta");
        assert!(store.read_range("f", 10, 20).unwrap().is_empty());
        assert!(matches!(
            store.read_range("f", 3, 1),
            Err(StoreError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_list_paths_is_recursive() {
        let store = MemoryStore::new("test");
        store.create_directory("root/empty_dir").unwrap();
        write_file(&store, "root/a/file.txt", b"some text");
        write_file(&store, "root/b/file.txt", b"some text");
        write_file(&store, "rootless.txt", b"x");

        let listed = store.list_paths("root").unwrap();
        assert_eq!(
            names(&listed),
            vec![
                "root/a",
                "root/a/file.txt",
                "root/b",
                "root/b/file.txt",
                "root/empty_dir"
            ]
        );
        assert!(store.list_paths("root/empty_dir").unwrap().is_empty());
        assert_eq!(
            names(&store.list_paths("root/a/file.txt").unwrap()),
            vec!["root/a/file.txt"]
        );
        assert_eq!(store.list_paths("").unwrap().len(), 6);
    }

    #[test]
    fn test_list_paths_missing_prefix() {
        let store = MemoryStore::new("test");
        assert!(matches!(
            store.list_paths("root/noexistent"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_directory_removes_subtree() {
        let store = MemoryStore::new("test");
        write_file(&store, "root/volatile/testdir/file.txt", b"data");
        store.create_directory("root/volatile/testdir/nested").unwrap();
        write_file(&store, "root/volatile_sibling.txt", b"x");

        store.delete_directory("root/volatile/testdir").unwrap();

        assert_eq!(
            names(&store.list_paths("root").unwrap()),
            vec!["root/volatile", "root/volatile_sibling.txt"]
        );
        assert!(matches!(
            store.delete_directory("root/volatile/testdir"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_file_checks_kind() {
        let store = MemoryStore::new("test");
        store.create_directory("root/dir").unwrap();
        assert!(matches!(
            store.delete_file("root/dir"),
            Err(StoreError::PathConflict(_))
        ));
        assert!(matches!(
            store.delete_file("root/missing"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_rename_file() {
        let store = MemoryStore::new("test");
        write_file(&store, "root/file.txt", b"data");

        store.rename_file("root/file.txt", "test/root/file_new.txt").unwrap();

        assert!(matches!(
            store.get_info("root/file.txt"),
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(store.read_range("root/file_new.txt", 0, 4).unwrap(), b"data");
    }

    #[test]
    fn test_rename_file_requires_destination_parent() {
        let store = MemoryStore::new("test");
        write_file(&store, "root/file.txt", b"data");
        assert!(matches!(
            store.rename_file("root/file.txt", "test/missing/file.txt"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_rename_missing_source_fails() {
        let store = MemoryStore::new("test");
        assert!(matches!(
            store.rename_file("root/noexistent", "test/root/x"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_rename_directory_moves_subtree() {
        let store = MemoryStore::new("test");
        write_file(&store, "root/testdir/file_new.txt", b"data");
        store.create_directory("root/testdir/nested").unwrap();

        store
            .rename_directory("root/testdir", "test/root/testdir_new")
            .unwrap();

        assert_eq!(
            names(&store.list_paths("root").unwrap()),
            vec![
                "root/testdir_new",
                "root/testdir_new/file_new.txt",
                "root/testdir_new/nested"
            ]
        );
    }

    #[test]
    fn test_rename_directory_into_itself_fails() {
        let store = MemoryStore::new("test");
        store.create_directory("root/dir").unwrap();
        assert!(matches!(
            store.rename_directory("root/dir", "test/root/dir/inner"),
            Err(StoreError::InvalidRenameTarget(_))
        ));
    }

    #[test]
    fn test_get_info_root() {
        let store = MemoryStore::new("test");
        let root = store.get_info("/").unwrap();
        assert!(root.is_directory);
        assert_eq!(root.name, "");
    }
}
