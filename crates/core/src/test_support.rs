//! Store double that records every primitive call.

use crate::{DataLakeFileSystem, MountConfig};
use adls_store::{MemoryStore, PathInfo, RemoteStore, StoreError, StoreResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

pub(crate) struct RecordingStore {
    inner: MemoryStore,
    calls: Mutex<Vec<String>>,
    failing_appends: AtomicUsize,
}

impl RecordingStore {
    pub(crate) fn new(file_system: &str) -> Self {
        Self {
            inner: MemoryStore::new(file_system),
            calls: Mutex::new(Vec::new()),
            failing_appends: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn clear(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Makes the next `count` `append_data` calls fail without staging anything.
    pub(crate) fn fail_appends(&self, count: usize) {
        self.failing_appends.store(count, Ordering::SeqCst);
    }

    fn record(&self, call: String) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl RemoteStore for RecordingStore {
    fn create_directory(&self, path: &str) -> StoreResult<()> {
        self.record(format!("create_directory {path}"));
        self.inner.create_directory(path)
    }

    fn delete_directory(&self, path: &str) -> StoreResult<()> {
        self.record(format!("delete_directory {path}"));
        self.inner.delete_directory(path)
    }

    fn create_file(&self, path: &str) -> StoreResult<PathInfo> {
        self.record(format!("create_file {path}"));
        self.inner.create_file(path)
    }

    fn delete_file(&self, path: &str) -> StoreResult<()> {
        self.record(format!("delete_file {path}"));
        self.inner.delete_file(path)
    }

    fn rename_file(&self, path: &str, new_name: &str) -> StoreResult<()> {
        self.record(format!("rename_file {path} {new_name}"));
        self.inner.rename_file(path, new_name)
    }

    fn rename_directory(&self, path: &str, new_name: &str) -> StoreResult<()> {
        self.record(format!("rename_directory {path} {new_name}"));
        self.inner.rename_directory(path, new_name)
    }

    fn list_paths(&self, prefix: &str) -> StoreResult<Vec<PathInfo>> {
        self.record(format!("list_paths {prefix}"));
        self.inner.list_paths(prefix)
    }

    fn read_range(&self, path: &str, start: u64, end: u64) -> StoreResult<Vec<u8>> {
        self.record(format!("read_range {path} {start} {end}"));
        self.inner.read_range(path, start, end)
    }

    fn append_data(&self, path: &str, offset: u64, data: &[u8]) -> StoreResult<()> {
        self.record(format!("append_data {path} {offset} {}", data.len()));
        let failing = self
            .failing_appends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Io(std::io::Error::other("transient")));
        }
        self.inner.append_data(path, offset, data)
    }

    fn flush(&self, path: &str, total_length: u64) -> StoreResult<()> {
        self.record(format!("flush {path} {total_length}"));
        self.inner.flush(path, total_length)
    }

    fn get_info(&self, path: &str) -> StoreResult<PathInfo> {
        self.record(format!("get_info {path}"));
        self.inner.get_info(path)
    }
}

/// Filesystem over a fresh recording store for file system `"test"`.
pub(crate) fn recording_fs() -> (DataLakeFileSystem, Arc<RecordingStore>) {
    let store = Arc::new(RecordingStore::new("test"));
    let config = MountConfig::new("memory://", None, "test").unwrap();
    let fs = DataLakeFileSystem::with_client(config, store.clone());
    (fs, store)
}
