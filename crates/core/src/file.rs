//! # Buffered File Handle
//!
//! Adapts the store's append/flush write protocol and its ranged reads to ordinary file-handle
//! semantics.
//!
//! ## Writing
//!
//! Written bytes accumulate in a pending buffer. Once the buffer reaches the block size (or on
//! an explicit flush) it is appended at the current write offset and the offset advances. Closing
//! appends whatever remains and then commits the file at its final length. The commit happens even
//! for a zero-byte file; without it the remote file stays uncommitted.
//!
//! The remote file is created on first upload, or at close for an empty file. Creation truncates
//! any existing file at the path.
//!
//! ## Reading
//!
//! The first read resolves the remote file with a point lookup. Each read then goes through the
//! handle's [`CacheKind`], which either issues exactly one range fetch or widens the fetch by one
//! block.

use crate::cache::{CacheKind, ReadCache};
use crate::constants::DEFAULT_BLOCK_SIZE;
use crate::lazy::OnceGuard;
use crate::{DataLakeFileSystem, FsError, FsResult};
use adls_store::StoreError;
use adls_types::StorePath;
use std::fmt;
use std::io::{self, SeekFrom};
use std::str::FromStr;

/// Direction a handle is open in. There is no append or read-write mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
}

impl OpenMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpenMode::Read => "rb",
            OpenMode::Write => "wb",
        }
    }
}

impl FromStr for OpenMode {
    type Err = FsError;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode {
            "rb" | "r" => Ok(OpenMode::Read),
            "wb" | "w" => Ok(OpenMode::Write),
            other => Err(FsError::UnsupportedMode(other.to_owned())),
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-handle tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileOptions {
    /// Upload chunk size in write mode, read-ahead width in read mode
    pub block_size: usize,
    pub cache: CacheKind,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            cache: CacheKind::default(),
        }
    }
}

impl FileOptions {
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_cache(mut self, cache: CacheKind) -> Self {
        self.cache = cache;
        self
    }
}

/// What the handle knows about its remote file once resolved.
#[derive(Debug)]
struct RemoteFile {
    size: u64,
    etag: String,
}

/// One open remote file.
///
/// A handle serves a single reader or writer; it is `Send` but takes `&mut self` for I/O.
pub struct BufferedFile<'fs> {
    fs: &'fs DataLakeFileSystem,
    path: StorePath,
    mode: OpenMode,
    block_size: usize,
    remote: OnceGuard<RemoteFile>,
    cache: ReadCache,
    loc: u64,
    write_offset: u64,
    pending: Vec<u8>,
    closed: bool,
}

impl<'fs> BufferedFile<'fs> {
    pub(crate) fn new(
        fs: &'fs DataLakeFileSystem,
        path: StorePath,
        mode: OpenMode,
        options: FileOptions,
    ) -> FsResult<Self> {
        if options.block_size == 0 {
            return Err(FsError::InvalidConfig(
                "block_size must be greater than zero".into(),
            ));
        }

        Ok(Self {
            fs,
            path,
            mode,
            block_size: options.block_size,
            remote: OnceGuard::new(),
            cache: ReadCache::new(options.cache, options.block_size),
            loc: 0,
            write_offset: 0,
            pending: Vec::new(),
            closed: false,
        })
    }

    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Bytes already appended to the remote file.
    pub fn write_offset(&self) -> u64 {
        self.write_offset
    }

    /// Bytes written but not yet appended.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Current position.
    pub fn tell(&self) -> u64 {
        self.loc
    }

    /// Length of the file: the committed size in read mode, everything written in write mode.
    pub fn size(&self) -> FsResult<u64> {
        match self.mode {
            OpenMode::Read => Ok(self.resolve()?.size),
            OpenMode::Write => Ok(self.write_offset + self.pending.len() as u64),
        }
    }

    /// Version token of the remote file as seen when the handle resolved it.
    pub fn etag(&self) -> FsResult<&str> {
        Ok(&self.resolve()?.etag)
    }

    fn require(&self, mode: OpenMode, operation: &'static str) -> FsResult<()> {
        if self.closed {
            return Err(FsError::Closed(self.path.to_string()));
        }
        if self.mode != mode {
            return Err(FsError::WrongMode {
                path: self.path.to_string(),
                operation,
            });
        }
        Ok(())
    }

    /// Resolves the remote file once: a point lookup for reads, `create_file` for writes.
    fn resolve(&self) -> FsResult<&RemoteFile> {
        self.remote.get_or_try_init(|| {
            let store = self.fs.store()?;
            match self.mode {
                OpenMode::Read => {
                    let info = store.get_info(self.path.as_str()).map_err(|e| match e {
                        StoreError::NotFound(_) => FsError::NotFound(self.path.to_string()),
                        other => FsError::Remote(other),
                    })?;
                    if info.is_directory {
                        return Err(FsError::IsADirectory(self.path.to_string()));
                    }
                    Ok(RemoteFile {
                        size: info.content_length,
                        etag: info.etag,
                    })
                }
                OpenMode::Write => {
                    let info = store.create_file(self.path.as_str())?;
                    tracing::debug!(path = %self.path, "Created remote file");
                    Ok(RemoteFile {
                        size: 0,
                        etag: info.etag,
                    })
                }
            }
        })
    }

    /// Fetches committed bytes `[start, end)` with one ranged read, bypassing the cache.
    pub fn fetch_range(&self, start: u64, end: u64) -> FsResult<Vec<u8>> {
        self.require(OpenMode::Read, "reading")?;
        self.resolve()?;
        fetch(self.fs, &self.path, start, end)
    }

    /// Reads up to `len` bytes from the current position.
    pub fn read_bytes(&mut self, len: usize) -> FsResult<Vec<u8>> {
        self.require(OpenMode::Read, "reading")?;
        let size = self.resolve()?.size;
        if len == 0 || self.loc >= size {
            return Ok(Vec::new());
        }

        let start = self.loc;
        let end = start.saturating_add(len as u64).min(size);
        let fs = self.fs;
        let path = &self.path;
        let data = self
            .cache
            .fetch(start, end, size, |from, to| fetch(fs, path, from, to))?;

        self.loc += data.len() as u64;
        Ok(data)
    }

    /// Reads from the current position to the end of the file.
    pub fn read_all(&mut self) -> FsResult<Vec<u8>> {
        self.require(OpenMode::Read, "reading")?;
        let size = self.resolve()?.size;
        let remaining = size.saturating_sub(self.loc);
        self.read_bytes(remaining as usize)
    }

    /// Buffers `data`, uploading a chunk whenever the buffer reaches the block size.
    ///
    /// On error `data` is not kept: the buffer and position are as they were before the call.
    pub fn write_bytes(&mut self, data: &[u8]) -> FsResult<usize> {
        self.require(OpenMode::Write, "writing")?;
        let buffered = self.pending.len();
        self.pending.extend_from_slice(data);
        self.loc += data.len() as u64;

        if self.pending.len() >= self.block_size {
            if let Err(e) = self.upload_chunk(false) {
                self.pending.truncate(buffered);
                self.loc -= data.len() as u64;
                return Err(e);
            }
        }
        Ok(data.len())
    }

    /// Appends any pending bytes without committing the file.
    pub fn flush(&mut self) -> FsResult<()> {
        if self.closed || self.mode == OpenMode::Read {
            return Ok(());
        }
        if !self.pending.is_empty() {
            self.upload_chunk(false)?;
        }
        Ok(())
    }

    /// Sends the pending buffer to the store; with `final_chunk` also commits the file.
    ///
    /// The pending buffer is only cleared once the append succeeds, so a failed upload can be
    /// retried by flushing or closing again.
    pub fn upload_chunk(&mut self, final_chunk: bool) -> FsResult<()> {
        self.require(OpenMode::Write, "writing")?;
        self.resolve()?;
        let fs = self.fs;
        let store = fs.store()?;

        if !self.pending.is_empty() {
            store.append_data(self.path.as_str(), self.write_offset, &self.pending)?;
            tracing::debug!(
                path = %self.path,
                offset = self.write_offset,
                len = self.pending.len(),
                "Appended chunk"
            );
            self.write_offset += self.pending.len() as u64;
            self.pending.clear();
        }

        if final_chunk {
            store.flush(self.path.as_str(), self.write_offset)?;
            tracing::debug!(path = %self.path, length = self.write_offset, "Committed file");
        }
        Ok(())
    }

    /// Moves the read position. Write handles only report their position.
    pub fn seek(&mut self, pos: SeekFrom) -> FsResult<u64> {
        if self.closed {
            return Err(FsError::Closed(self.path.to_string()));
        }
        if self.mode == OpenMode::Write {
            return match pos {
                SeekFrom::Current(0) => Ok(self.loc),
                _ => Err(FsError::WrongMode {
                    path: self.path.to_string(),
                    operation: "seeking",
                }),
            };
        }

        let target = match pos {
            SeekFrom::Start(n) => i128::from(n),
            SeekFrom::Current(delta) => i128::from(self.loc) + i128::from(delta),
            SeekFrom::End(delta) => i128::from(self.resolve()?.size) + i128::from(delta),
        };
        if target < 0 {
            return Err(FsError::InvalidSeek(
                i64::try_from(target).unwrap_or(i64::MIN),
            ));
        }
        self.loc = u64::try_from(target).unwrap_or(u64::MAX);
        Ok(self.loc)
    }

    /// Finishes the handle. Idempotent.
    ///
    /// In write mode this uploads the remaining buffer and commits the file. If that fails the
    /// handle stays open.
    pub fn close(&mut self) -> FsResult<()> {
        if self.closed {
            return Ok(());
        }
        if self.mode == OpenMode::Write {
            self.upload_chunk(true)?;
        }
        self.closed = true;
        self.cache = ReadCache::new(CacheKind::None, self.block_size);
        Ok(())
    }
}

fn fetch(fs: &DataLakeFileSystem, path: &StorePath, start: u64, end: u64) -> FsResult<Vec<u8>> {
    let data = fs.store()?.read_range(path.as_str(), start, end)?;
    tracing::debug!(path = %path, start, end, len = data.len(), "Fetched range");
    Ok(data)
}

impl fmt::Debug for BufferedFile<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedFile")
            .field("path", &self.path.as_str())
            .field("mode", &self.mode)
            .field("loc", &self.loc)
            .field("write_offset", &self.write_offset)
            .field("pending", &self.pending.len())
            .field("closed", &self.closed)
            .finish()
    }
}

impl Drop for BufferedFile<'_> {
    fn drop(&mut self) {
        if self.closed || self.mode == OpenMode::Read {
            return;
        }
        if let Err(e) = self.close() {
            tracing::warn!(path = %self.path, error = %e, "Dropped write handle without commit");
        }
    }
}

impl io::Read for BufferedFile<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.read_bytes(buf.len()).map_err(io::Error::other)?;
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }
}

impl io::Write for BufferedFile<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf).map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        BufferedFile::flush(self).map_err(io::Error::other)
    }
}

impl io::Seek for BufferedFile<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        BufferedFile::seek(self, pos).map_err(io::Error::other)
    }
}
