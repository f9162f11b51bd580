//! Store backed by a local directory
//!
//! [`LocalStore`] maps one file system onto `<base>/<file_system>/` on disk so the whole stack
//! can run against real files without a network service.
//!
//! # Append/flush emulation
//!
//! Appended bytes are staged in memory per path and only written to disk by `flush`, so a
//! reader never observes uncommitted data. Staged bytes are lost if the process exits before
//! the flush, which matches a remote store discarding an uncommitted upload.
//!
//! # Metadata
//!
//! - etag: first 16 hex digits of SHA-256 over size and modification time
//! - permissions: Unix mode bits (fixed defaults elsewhere)
//! - owner/group: numeric uid/gid on Unix

use crate::client::rename_target;
use crate::path_info::permissions_from_mode;
use crate::{PathInfo, RemoteStore, StoreError, StoreResult};
use adls_types::StorePath;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// [`RemoteStore`] over a directory on the local filesystem.
#[derive(Debug)]
pub struct LocalStore {
    file_system: String,
    root: PathBuf,
    staged: Mutex<HashMap<StorePath, Vec<u8>>>,
}

impl LocalStore {
    /// Opens (creating if needed) the file system directory `<base>/<file_system>`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory cannot be created or canonicalised, and
    /// `StoreError::PathConflict` if `file_system` is not a single path segment.
    pub fn open(base: &Path, file_system: &str) -> StoreResult<Self> {
        let segment = StorePath::parse(file_system)?;
        if segment.is_root() || segment.segments().count() != 1 {
            return Err(StoreError::PathConflict(format!(
                "file system name must be a single segment: {file_system:?}"
            )));
        }

        let root = base.join(segment.as_str());
        fs::create_dir_all(&root).map_err(|e| {
            StoreError::Io(io::Error::new(
                e.kind(),
                format!("Failed to create file system directory {}: {}", root.display(), e),
            ))
        })?;
        let root = root.canonicalize()?;

        tracing::debug!("local store for {} at {}", file_system, root.display());

        Ok(Self {
            file_system: file_system.to_owned(),
            root,
            staged: Mutex::new(HashMap::new()),
        })
    }

    pub fn file_system(&self) -> &str {
        &self.file_system
    }

    /// Directory holding this file system's entries
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn staged(&self) -> MutexGuard<'_, HashMap<StorePath, Vec<u8>>> {
        self.staged.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn disk_path(&self, path: &StorePath) -> PathBuf {
        path.segments()
            .fold(self.root.clone(), |acc, segment| acc.join(segment))
    }

    /// Metadata for `path`, or `None` if nothing exists there.
    fn stat(&self, path: &StorePath) -> StoreResult<Option<fs::Metadata>> {
        match fs::metadata(self.disk_path(path)) {
            Ok(meta) => Ok(Some(meta)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            // Walking through a file ("a/file.txt/x") is ENOTDIR rather than NotFound.
            Err(_) if path
                .ancestors()
                .iter()
                .any(|a| self.disk_path(a).is_file()) =>
            {
                Ok(None)
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn require_file(&self, path: &StorePath) -> StoreResult<fs::Metadata> {
        match self.stat(path)? {
            None => Err(StoreError::NotFound(path.to_string())),
            Some(meta) if meta.is_dir() => {
                Err(StoreError::PathConflict(format!("{path} is a directory")))
            }
            Some(meta) => Ok(meta),
        }
    }

    fn require_directory(&self, path: &StorePath) -> StoreResult<()> {
        match self.stat(path)? {
            None => Err(StoreError::NotFound(path.to_string())),
            Some(meta) if !meta.is_dir() => {
                Err(StoreError::PathConflict(format!("{path} is a file")))
            }
            Some(_) => Ok(()),
        }
    }

    fn require_parent(&self, path: &StorePath) -> StoreResult<()> {
        match path.parent() {
            Some(parent) if !parent.is_root() => self.require_directory(&parent),
            _ => Ok(()),
        }
    }

    fn info(&self, path: &StorePath, meta: &fs::Metadata) -> PathInfo {
        let is_directory = meta.is_dir();
        let content_length = if is_directory { 0 } else { meta.len() };
        let last_modified: DateTime<Utc> = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        let mut hasher = Sha256::new();
        hasher.update(content_length.to_le_bytes());
        hasher.update(
            last_modified
                .timestamp_nanos_opt()
                .unwrap_or_default()
                .to_le_bytes(),
        );
        let digest = hex::encode(hasher.finalize());
        let etag = format!("0x{}", digest[..16].to_uppercase());

        let (owner, group, permissions) = ownership(meta, is_directory);

        PathInfo {
            name: path.to_string(),
            is_directory,
            content_length,
            last_modified,
            owner,
            group,
            permissions,
            etag,
        }
    }

    /// Moves staged buffers from `source` (and anything below it) to `target`.
    fn move_staged(&self, source: &StorePath, target: &StorePath) -> StoreResult<()> {
        let mut staged = self.staged();
        let keys: Vec<StorePath> = staged
            .keys()
            .filter(|key| key.starts_with(source))
            .cloned()
            .collect();
        for old in keys {
            let Some(suffix) = old.strip_prefix(source) else {
                continue;
            };
            let new = target.join(suffix)?;
            if let Some(buffer) = staged.remove(&old) {
                staged.insert(new, buffer);
            }
        }
        Ok(())
    }

    fn walk(&self, dir: &Path, base: &StorePath, out: &mut Vec<PathInfo>) -> StoreResult<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                tracing::warn!("skipping non UTF-8 entry in {}", dir.display());
                continue;
            };
            let path = base.join(name)?;
            let meta = entry.metadata()?;
            out.push(self.info(&path, &meta));
            if meta.is_dir() {
                self.walk(&entry.path(), &path, out)?;
            }
        }
        Ok(())
    }
}

#[cfg(unix)]
fn ownership(meta: &fs::Metadata, _is_directory: bool) -> (String, String, String) {
    use std::os::unix::fs::MetadataExt;
    (
        meta.uid().to_string(),
        meta.gid().to_string(),
        permissions_from_mode(meta.mode()),
    )
}

#[cfg(not(unix))]
fn ownership(_meta: &fs::Metadata, is_directory: bool) -> (String, String, String) {
    let mode = if is_directory { 0o750 } else { 0o640 };
    (
        crate::DEFAULT_OWNER.to_owned(),
        crate::DEFAULT_GROUP.to_owned(),
        permissions_from_mode(mode),
    )
}

impl RemoteStore for LocalStore {
    fn create_directory(&self, path: &str) -> StoreResult<()> {
        let path = StorePath::parse(path)?;
        match self.stat(&path)? {
            Some(meta) if !meta.is_dir() => Err(StoreError::AlreadyExists(path.to_string())),
            Some(_) => Ok(()),
            None => {
                if let Some(file) = path.ancestors().into_iter().find(|a| self.disk_path(a).is_file())
                {
                    return Err(StoreError::PathConflict(format!(
                        "{file} is a file, cannot create {path} below it"
                    )));
                }
                fs::create_dir_all(self.disk_path(&path))?;
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
        self.require_directory(&path)?;
        fs::remove_dir_all(self.disk_path(&path))?;
        self.staged().retain(|key, _| !key.starts_with(&path));
        Ok(())
    }

    fn create_file(&self, path: &str) -> StoreResult<PathInfo> {
        let path = StorePath::parse(path)?;
        if path.is_root() {
            return Err(StoreError::PathConflict("the file system root is a directory".into()));
        }
        if let Some(meta) = self.stat(&path)? {
            if meta.is_dir() {
                return Err(StoreError::PathConflict(format!("{path} is a directory")));
            }
        }
        if let Some(parent) = path.parent() {
            self.create_directory(parent.as_str())?;
        }

        let disk_path = self.disk_path(&path);
        fs::File::create(&disk_path)?;
        self.staged().remove(&path);

        let meta = fs::metadata(&disk_path)?;
        Ok(self.info(&path, &meta))
    }

    fn delete_file(&self, path: &str) -> StoreResult<()> {
        let path = StorePath::parse(path)?;
        self.require_file(&path)?;
        fs::remove_file(self.disk_path(&path))?;
        self.staged().remove(&path);
        Ok(())
    }

    fn rename_file(&self, path: &str, new_name: &str) -> StoreResult<()> {
        let source = StorePath::parse(path)?;
        let target = rename_target(&self.file_system, new_name)?;

        self.require_file(&source)?;
        self.require_parent(&target)?;
        if self.stat(&target)?.is_some_and(|meta| meta.is_dir()) {
            return Err(StoreError::PathConflict(format!("{target} is a directory")));
        }

        fs::rename(self.disk_path(&source), self.disk_path(&target))?;
        self.move_staged(&source, &target)
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

        self.require_directory(&source)?;
        self.require_parent(&target)?;
        if self.stat(&target)?.is_some() {
            return Err(StoreError::AlreadyExists(target.to_string()));
        }

        fs::rename(self.disk_path(&source), self.disk_path(&target))?;
        self.move_staged(&source, &target)
    }

    fn list_paths(&self, prefix: &str) -> StoreResult<Vec<PathInfo>> {
        let prefix = StorePath::parse(prefix)?;
        let meta = self
            .stat(&prefix)?
            .ok_or_else(|| StoreError::NotFound(prefix.to_string()))?;

        if !meta.is_dir() {
            return Ok(vec![self.info(&prefix, &meta)]);
        }

        let mut out = Vec::new();
        self.walk(&self.disk_path(&prefix), &prefix, &mut out)?;
        Ok(out)
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
        let meta = self.require_file(&path)?;

        let len = meta.len();
        let start = start.min(len);
        let end = end.min(len);

        let mut file = fs::File::open(self.disk_path(&path))?;
        file.seek(SeekFrom::Start(start))?;
        let mut buffer = Vec::with_capacity((end - start) as usize);
        file.take(end - start).read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    fn append_data(&self, path: &str, offset: u64, data: &[u8]) -> StoreResult<()> {
        let path = StorePath::parse(path)?;
        let meta = self.require_file(&path)?;

        let mut staged = self.staged();
        let buffer = staged.entry(path.clone()).or_default();
        let expected = meta.len() + buffer.len() as u64;
        if offset != expected {
            return Err(StoreError::InvalidOffset {
                path: path.to_string(),
                expected,
                actual: offset,
            });
        }
        buffer.extend_from_slice(data);
        Ok(())
    }

    fn flush(&self, path: &str, total_length: u64) -> StoreResult<()> {
        let path = StorePath::parse(path)?;
        let meta = self.require_file(&path)?;

        let mut staged = self.staged();
        let pending = staged.get(&path).map_or(0, |b| b.len() as u64);
        let expected = meta.len() + pending;
        if total_length != expected {
            return Err(StoreError::InvalidFlushLength {
                path: path.to_string(),
                expected,
                actual: total_length,
            });
        }

        let buffer = staged.remove(&path).unwrap_or_default();
        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(self.disk_path(&path))?;
        file.write_all(&buffer)?;
        file.sync_data()?;
        Ok(())
    }

    fn get_info(&self, path: &str) -> StoreResult<PathInfo> {
        let path = StorePath::parse(path)?;
        let meta = self
            .stat(&path)?
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        Ok(self.info(&path, &meta))
    }
}
