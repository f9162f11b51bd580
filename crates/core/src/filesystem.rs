//! # Filesystem Façade
//!
//! [`DataLakeFileSystem`] presents a path-based API over one container of a hierarchical
//! namespace store. Each call becomes one or more [`RemoteStore`] primitives.
//!
//! ## Dispatch
//!
//! Operations that must tell files from directories (`rm`, `mv`) first [`probe`] the path and
//! then branch on the resulting [`PathKind`]. The failure policy differs per operation:
//!
//! - `rm` skips paths that are neither file nor directory
//! - `mv` dispatches an absent source to `rename_file` and lets the store's failure propagate
//! - `is_dir`, `is_file` and `exists` answer `false` on any lookup failure
//!
//! Everything else surfaces store failures unmodified.
//!
//! [`probe`]: DataLakeFileSystem::probe

use crate::config::{connect, MountConfig};
use crate::detail::{EntryDetail, Listing, PathKind};
use crate::file::{BufferedFile, FileOptions, OpenMode};
use crate::lazy::OnceGuard;
use crate::{FsError, FsResult};
use adls_store::{RemoteStore, StoreError};
use adls_types::StorePath;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// Builds the store client for a mount on first use.
pub type Connector = Box<dyn Fn(&MountConfig) -> FsResult<Arc<dyn RemoteStore>> + Send + Sync>;

/// One logical mount of a remote file system.
///
/// The store connection is resolved lazily on first use and reused for the lifetime of the
/// value. Resolution is exclusive: concurrent first callers share a single connection.
pub struct DataLakeFileSystem {
    config: MountConfig,
    connector: Connector,
    store: OnceGuard<Arc<dyn RemoteStore>>,
}

impl DataLakeFileSystem {
    /// Mount using the default connector for the configured endpoint.
    pub fn new(config: MountConfig) -> Self {
        Self::with_connector(config, connect)
    }

    /// Mount with a caller-supplied connector, e.g. a network client.
    pub fn with_connector(
        config: MountConfig,
        connector: impl Fn(&MountConfig) -> FsResult<Arc<dyn RemoteStore>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            config,
            connector: Box::new(connector),
            store: OnceGuard::new(),
        }
    }

    /// Mount over an already connected client.
    pub fn with_client(config: MountConfig, client: Arc<dyn RemoteStore>) -> Self {
        Self {
            config,
            connector: Box::new(connect),
            store: OnceGuard::with_value(client),
        }
    }

    pub fn config(&self) -> &MountConfig {
        &self.config
    }

    pub fn file_system(&self) -> &str {
        self.config.file_system()
    }

    /// The store client, connecting on first call.
    pub fn store(&self) -> FsResult<&Arc<dyn RemoteStore>> {
        self.store.get_or_try_init(|| {
            let store = (self.connector)(&self.config)?;
            tracing::info!(
                account_url = %self.config.account_url(),
                file_system = %self.config.file_system(),
                "Resolved store connection"
            );
            Ok(store)
        })
    }

    /// Classifies `path` with a single point lookup. Lookup failures count as absent.
    pub fn probe(&self, path: &str) -> FsResult<PathKind> {
        let path = StorePath::parse(path)?;
        let kind = match self.store()?.get_info(path.as_str()) {
            Ok(info) => PathKind::of(&info),
            Err(_) => PathKind::Absent,
        };
        tracing::debug!(path = %path, ?kind, "Probed path");
        Ok(kind)
    }

    // ----- Directories -----

    /// Creates a directory. An existing directory is not an error.
    pub fn mkdir(&self, path: &str) -> FsResult<()> {
        let path = StorePath::parse(path)?;
        self.store()?
            .create_directory(path.as_str())
            .map_err(|source| FsError::CreateFailed {
                path: path.to_string(),
                source,
            })?;
        tracing::debug!(path = %path, "Created directory");
        Ok(())
    }

    /// Creates a directory and any missing parents.
    ///
    /// With `exist_ok == false` an existing directory is `AlreadyExists`.
    pub fn makedirs(&self, path: &str, exist_ok: bool) -> FsResult<()> {
        if !exist_ok && self.probe(path)? == PathKind::Directory {
            return Err(FsError::AlreadyExists(path.to_owned()));
        }
        self.mkdir(path)
    }

    /// Deletes exactly the named directory.
    pub fn rmdir(&self, path: &str) -> FsResult<()> {
        let path = StorePath::parse(path)?;
        self.store()?
            .delete_directory(path.as_str())
            .map_err(|source| match source {
                StoreError::NotFound(_) => FsError::NotFound(path.to_string()),
                source => FsError::NotEmptyOrFailed {
                    path: path.to_string(),
                    source,
                },
            })?;
        tracing::debug!(path = %path, "Removed directory");
        Ok(())
    }

    // ----- Removal and moves -----

    /// Removes one file or directory subtree. A missing path is skipped.
    ///
    /// Directory deletion in the store is always recursive, so `recursive` does not change what is
    /// removed.
    pub fn rm(&self, path: &str, recursive: bool) -> FsResult<()> {
        self.rm_many(&[path], recursive)
    }

    /// Removes each path in order, skipping those that match neither file nor directory.
    pub fn rm_many<S: AsRef<str>>(&self, paths: &[S], recursive: bool) -> FsResult<()> {
        let store = self.store()?;
        for path in paths {
            let path = StorePath::parse(path.as_ref())?;
            match self.probe(path.as_str())? {
                PathKind::File => {
                    store.delete_file(path.as_str())?;
                    tracing::debug!(path = %path, "Deleted file");
                }
                PathKind::Directory => {
                    store.delete_directory(path.as_str())?;
                    tracing::debug!(path = %path, recursive, "Deleted directory");
                }
                PathKind::Absent => {
                    tracing::debug!(path = %path, "Skipped missing path");
                }
            }
        }
        Ok(())
    }

    /// Moves a file or directory subtree to `destination`.
    ///
    /// The source is not checked for existence; a missing source goes to `rename_file` and the
    /// store's failure is returned unchanged.
    pub fn mv(&self, source: &str, destination: &str) -> FsResult<()> {
        let source = StorePath::parse(source)?;
        let destination = StorePath::parse(destination)?;
        let target = self.config.file_system_name().qualify(&destination);
        let store = self.store()?;

        match self.probe(source.as_str())? {
            PathKind::Directory => store.rename_directory(source.as_str(), &target)?,
            PathKind::File | PathKind::Absent => store.rename_file(source.as_str(), &target)?,
        }
        tracing::debug!(source = %source, target = %target, "Moved path");
        Ok(())
    }

    // ----- Listing and queries -----

    /// Lists everything below `path`, sorted by full path.
    pub fn list(&self, path: &str, with_detail: bool) -> FsResult<Listing> {
        let path = StorePath::parse(path)?;
        let mut entries: Vec<EntryDetail> = self
            .store()?
            .list_paths(path.as_str())?
            .into_iter()
            .map(EntryDetail::from)
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        if with_detail {
            Ok(Listing::Detailed(entries))
        } else {
            Ok(Listing::Names(entries.into_iter().map(|e| e.name).collect()))
        }
    }

    pub fn ls(&self, path: &str) -> FsResult<Vec<String>> {
        match self.list(path, false)? {
            Listing::Names(names) => Ok(names),
            Listing::Detailed(entries) => Ok(entries.into_iter().map(|e| e.name).collect()),
        }
    }

    pub fn ls_detail(&self, path: &str) -> FsResult<Vec<EntryDetail>> {
        match self.list(path, true)? {
            Listing::Detailed(entries) => Ok(entries),
            Listing::Names(_) => Ok(Vec::new()),
        }
    }

    /// Detail record for exactly one path.
    pub fn info(&self, path: &str) -> FsResult<EntryDetail> {
        let path = StorePath::parse(path)?;
        let info = self
            .store()?
            .get_info(path.as_str())
            .map_err(|e| match e {
                StoreError::NotFound(_) => FsError::NotFound(path.to_string()),
                other => FsError::Remote(other),
            })?;
        Ok(EntryDetail::from(info))
    }

    pub fn is_dir(&self, path: &str) -> bool {
        matches!(self.probe(path), Ok(PathKind::Directory))
    }

    pub fn is_file(&self, path: &str) -> bool {
        matches!(self.probe(path), Ok(PathKind::File))
    }

    pub fn exists(&self, path: &str) -> bool {
        self.info(path).is_ok()
    }

    /// The entry's etag. This is a version token, not a hash of the content.
    pub fn checksum(&self, path: &str) -> FsResult<String> {
        Ok(self.info(path)?.etag)
    }

    pub fn size(&self, path: &str) -> FsResult<u64> {
        Ok(self.info(path)?.size)
    }

    pub fn modified(&self, path: &str) -> FsResult<DateTime<Utc>> {
        Ok(self.info(path)?.last_modified)
    }

    // ----- Files -----

    /// Opens a handle with default options. `mode` is `"rb"`/`"r"` or `"wb"`/`"w"`.
    ///
    /// # Errors
    ///
    /// Any other mode fails here with `UnsupportedMode`, before the store is contacted.
    pub fn open(&self, path: &str, mode: &str) -> FsResult<BufferedFile<'_>> {
        let mode: OpenMode = mode.parse()?;
        self.open_with(path, mode, FileOptions::default())
    }

    pub fn open_with(
        &self,
        path: &str,
        mode: OpenMode,
        options: FileOptions,
    ) -> FsResult<BufferedFile<'_>> {
        let path = StorePath::parse(path)?;
        BufferedFile::new(self, path, mode, options)
    }

    /// Whole content of a file.
    pub fn cat(&self, path: &str) -> FsResult<Vec<u8>> {
        let mut file = self.open(path, "rb")?;
        let data = file.read_all()?;
        file.close()?;
        Ok(data)
    }

    /// Bytes `[start, end)` of a file, clamped to its length.
    pub fn cat_range(&self, path: &str, start: u64, end: u64) -> FsResult<Vec<u8>> {
        let options = FileOptions::default().with_cache(crate::CacheKind::None);
        let mut file = self.open_with(path, OpenMode::Read, options)?;
        file.seek(std::io::SeekFrom::Start(start))?;
        let data = file.read_bytes(end.saturating_sub(start) as usize)?;
        file.close()?;
        Ok(data)
    }

    /// Replaces the file at `path` with `data`.
    pub fn pipe(&self, path: &str, data: &[u8]) -> FsResult<()> {
        let mut file = self.open(path, "wb")?;
        file.write_bytes(data)?;
        file.close()
    }
}

impl fmt::Debug for DataLakeFileSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataLakeFileSystem")
            .field("config", &self.config)
            .field("connected", &self.store.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::recording_fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// `root/a/file.txt` (9 bytes) and `root/empty_dir`.
    fn populated() -> (DataLakeFileSystem, Arc<crate::test_support::RecordingStore>) {
        let (fs, store) = recording_fs();
        fs.mkdir("root/empty_dir").unwrap();
        fs.pipe("root/a/file.txt", b"some text").unwrap();
        store.clear();
        (fs, store)
    }

    #[test]
    fn test_ls() {
        let (fs, _) = populated();

        assert_eq!(
            fs.ls("root").unwrap(),
            vec!["root/a", "root/a/file.txt", "root/empty_dir"]
        );
        assert!(fs.ls("root/empty_dir").unwrap().is_empty());
        assert_eq!(fs.ls("root/a/file.txt").unwrap(), vec!["root/a/file.txt"]);
    }

    #[test]
    fn test_ls_detail_matches_names() {
        let (fs, _) = populated();

        let names = fs.ls("root").unwrap();
        let detailed = fs.ls_detail("root").unwrap();
        let detail_names: Vec<String> = detailed.iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, detail_names);

        let listing = fs.list("root", true).unwrap();
        assert_eq!(listing.len(), 3);
        assert_eq!(listing.names(), vec!["root/a", "root/a/file.txt", "root/empty_dir"]);
    }

    #[test]
    fn test_ls_missing_path_propagates_store_error() {
        let (fs, _) = populated();
        assert!(matches!(
            fs.ls("root/not-a-dir"),
            Err(FsError::Remote(StoreError::NotFound(_)))
        ));
    }

    #[test]
    fn test_info_matches_ls_detail_entry() {
        let (fs, _) = populated();

        let info = fs.info("root/a/file.txt").unwrap();
        assert_eq!(info.size, 9);
        assert!(!info.is_dir());

        let listed = fs
            .ls_detail("root/a")
            .unwrap()
            .into_iter()
            .find(|e| e.name == "root/a/file.txt")
            .unwrap();
        assert_eq!(info, listed);

        assert!(fs.info("root/a").unwrap().is_dir());
        assert!(matches!(
            fs.info("root/missing"),
            Err(FsError::NotFound(p)) if p == "root/missing"
        ));
    }

    #[test]
    fn test_isdir_isfile_exists() {
        let (fs, _) = populated();

        assert!(fs.is_dir("root"));
        assert!(fs.is_dir("root/empty_dir"));
        assert!(!fs.is_dir("root/a/file.txt"));
        assert!(fs.is_file("root/a/file.txt"));
        assert!(!fs.is_file("root/a"));

        for missing in ["root/missing", "root/a/file.txt/below", "nope"] {
            assert!(!fs.is_dir(missing));
            assert!(!fs.is_file(missing));
            assert!(!fs.exists(missing));
        }
        assert!(fs.exists("root/a"));
    }

    #[test]
    fn test_checksum_is_stable_until_write() {
        let (fs, _) = populated();

        let first = fs.checksum("root/a/file.txt").unwrap();
        let second = fs.checksum("root/a/file.txt").unwrap();
        assert!(!first.is_empty());
        assert_eq!(first, second);

        fs.pipe("root/a/file.txt", b"other").unwrap();
        assert_ne!(fs.checksum("root/a/file.txt").unwrap(), first);
    }

    #[test]
    fn test_size_and_modified() {
        let (fs, _) = populated();
        assert_eq!(fs.size("root/a/file.txt").unwrap(), 9);
        assert_eq!(fs.size("root/a").unwrap(), 0);
        assert!(fs.modified("root/a/file.txt").unwrap() <= Utc::now());
    }

    #[test]
    fn test_mkdir() {
        let (fs, store) = populated();

        fs.mkdir("root/new").unwrap();
        fs.mkdir("root/new").unwrap();
        assert!(fs.is_dir("root/new"));
        assert_eq!(store.calls()[0], "create_directory root/new");

        assert!(matches!(
            fs.mkdir("root/a/file.txt"),
            Err(FsError::CreateFailed { .. })
        ));
    }

    #[test]
    fn test_makedirs() {
        let (fs, _) = populated();

        fs.makedirs("root/b/c/d", false).unwrap();
        assert!(fs.is_dir("root/b"));
        assert!(fs.is_dir("root/b/c/d"));

        fs.makedirs("root/b/c/d", true).unwrap();
        assert!(matches!(
            fs.makedirs("root/b/c/d", false),
            Err(FsError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_rmdir() {
        let (fs, _) = populated();

        fs.rmdir("root/empty_dir").unwrap();
        assert!(!fs.exists("root/empty_dir"));

        assert!(matches!(
            fs.rmdir("root/empty_dir"),
            Err(FsError::NotFound(_))
        ));
        assert!(matches!(
            fs.rmdir("root/a/file.txt"),
            Err(FsError::NotEmptyOrFailed { .. })
        ));
    }

    #[test]
    fn test_rm_file_and_directory() {
        let (fs, store) = populated();

        fs.rm("root/a/file.txt", false).unwrap();
        assert!(!fs.exists("root/a/file.txt"));
        assert!(fs.is_dir("root/a"));
        assert!(store
            .calls()
            .contains(&"delete_file root/a/file.txt".to_string()));

        fs.pipe("root/a/b/deep.txt", b"deep").unwrap();
        fs.rm("root/a", true).unwrap();
        assert_eq!(fs.ls("root").unwrap(), vec!["root/empty_dir"]);
    }

    #[test]
    fn test_rm_many_skips_missing_paths() {
        let (fs, store) = populated();

        fs.rm_many(&["root/missing", "root/a", "root/a/file.txt"], true)
            .unwrap();

        assert_eq!(
            store.calls(),
            vec![
                "get_info root/missing",
                "get_info root/a",
                "delete_directory root/a",
                "get_info root/a/file.txt",
            ]
        );
        assert_eq!(fs.ls("root").unwrap(), vec!["root/empty_dir"]);
    }

    #[test]
    fn test_mv_file() {
        let (fs, store) = populated();

        fs.mv("root/a/file.txt", "root/a/file2.txt").unwrap();
        assert!(fs.is_file("root/a/file2.txt"));
        assert!(!fs.is_file("root/a/file.txt"));
        assert!(store
            .calls()
            .contains(&"rename_file root/a/file.txt test/root/a/file2.txt".to_string()));
        assert_eq!(fs.cat("root/a/file2.txt").unwrap(), b"some text");
    }

    #[test]
    fn test_mv_directory_moves_subtree() {
        let (fs, store) = populated();

        fs.mv("root/a", "root/b").unwrap();
        assert!(store
            .calls()
            .contains(&"rename_directory root/a test/root/b".to_string()));
        assert!(fs.is_dir("root/b"));
        assert!(fs.is_file("root/b/file.txt"));
        assert!(!fs.exists("root/a"));
        assert_eq!(
            fs.ls("root").unwrap(),
            vec!["root/b", "root/b/file.txt", "root/empty_dir"]
        );
    }

    #[test]
    fn test_mv_missing_source_propagates_store_error() {
        let (fs, store) = populated();

        let err = fs.mv("root/missing.txt", "root/other.txt").unwrap_err();
        assert!(matches!(err, FsError::Remote(StoreError::NotFound(_))));
        assert!(err.is_not_found());
        assert_eq!(
            store.calls(),
            vec![
                "get_info root/missing.txt",
                "rename_file root/missing.txt test/root/other.txt",
            ]
        );
    }

    #[test]
    fn test_open_rejects_unsupported_mode_without_store_calls() {
        let (fs, store) = populated();

        assert!(matches!(
            fs.open("root/a/file.txt", "ab"),
            Err(FsError::UnsupportedMode(m)) if m == "ab"
        ));
        assert!(store.calls().is_empty());
    }

    #[test]
    fn test_open_round_trip() {
        let (fs, _) = populated();

        let mut f = fs.open("root/x/file.txt", "wb").unwrap();
        f.write_bytes(b"data").unwrap();
        f.close().unwrap();

        let mut f = fs.open("root/x/file.txt", "rb").unwrap();
        assert_eq!(f.read_all().unwrap(), b"data");
    }

    #[test]
    fn test_round_trip_empty_and_multi_chunk() {
        let (fs, store) = populated();

        fs.pipe("root/empty.bin", b"").unwrap();
        assert!(fs.cat("root/empty.bin").unwrap().is_empty());

        let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let mut f = fs
            .open_with(
                "root/big.bin",
                OpenMode::Write,
                FileOptions::default().with_block_size(1024),
            )
            .unwrap();
        for chunk in payload.chunks(700) {
            f.write_bytes(chunk).unwrap();
        }
        f.close().unwrap();

        let appends = store
            .calls()
            .iter()
            .filter(|c| c.starts_with("append_data root/big.bin"))
            .count();
        assert!(appends > 1);
        assert_eq!(fs.cat("root/big.bin").unwrap(), payload);
        assert_eq!(fs.cat_range("root/big.bin", 100, 200).unwrap(), &payload[100..200]);
        assert_eq!(
            fs.cat_range("root/big.bin", 9_990, 20_000).unwrap(),
            &payload[9_990..]
        );
    }

    #[test]
    fn test_pipe_overwrites() {
        let (fs, _) = populated();
        fs.pipe("root/a/file.txt", b"new").unwrap();
        assert_eq!(fs.cat("root/a/file.txt").unwrap(), b"new");
        assert_eq!(fs.size("root/a/file.txt").unwrap(), 3);
    }

    #[test]
    fn test_invalid_path_is_rejected() {
        let (fs, store) = populated();
        assert!(matches!(fs.info("root/../etc"), Err(FsError::InvalidPath(_))));
        assert!(!fs.is_file("root/../etc"));
        assert!(store.calls().is_empty());
    }

    #[test]
    fn test_connection_resolved_once() {
        let connects = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&connects);
        let config = MountConfig::new("memory://", None, "test").unwrap();
        let fs = DataLakeFileSystem::with_connector(config, move |cfg| {
            counter.fetch_add(1, Ordering::SeqCst);
            connect(cfg)
        });

        fs.mkdir("root").unwrap();
        fs.pipe("root/a.txt", b"abc").unwrap();
        assert_eq!(fs.cat("root/a.txt").unwrap(), b"abc");
        assert_eq!(connects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsupported_endpoint_surfaces_on_first_use() {
        let config = MountConfig::new("https://acct.dfs.core.windows.net/", None, "test").unwrap();
        let fs = DataLakeFileSystem::new(config);

        assert!(matches!(fs.ls("root"), Err(FsError::UnsupportedEndpoint(_))));
        assert!(!fs.exists("root"));
    }

    #[test]
    fn test_local_endpoint_round_trip() {
        let temp = tempfile::TempDir::new().unwrap();
        let config =
            MountConfig::new(format!("file://{}", temp.path().display()), None, "test").unwrap();
        let fs = DataLakeFileSystem::new(config);

        fs.mkdir("root/empty_dir").unwrap();
        fs.pipe("root/a/file.txt", b"some text").unwrap();
        assert_eq!(
            fs.ls("root").unwrap(),
            vec!["root/a", "root/a/file.txt", "root/empty_dir"]
        );
        assert_eq!(fs.info("root/a/file.txt").unwrap().size, 9);

        fs.mv("root/a", "root/b").unwrap();
        assert_eq!(fs.cat("root/b/file.txt").unwrap(), b"some text");
        fs.rm("root/b", true).unwrap();
        assert!(!fs.exists("root/b"));
    }
}
