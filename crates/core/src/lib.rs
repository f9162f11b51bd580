//! # ADLS Core
//!
//! POSIX-like file and directory access over a hierarchical-namespace object store.
//!
//! The store only offers flat per-path primitives (see [`adls_store::RemoteStore`]). This crate
//! layers two things on top:
//! - [`DataLakeFileSystem`]: the path-based façade. It decides file versus directory, maps
//!   subtree operations onto single store calls and shapes listings into [`EntryDetail`] records
//! - [`BufferedFile`]: a per-open-file handle doing ranged reads and the append/flush write
//!   protocol, usable through `std::io::{Read, Write, Seek}`
//!
//! **No API concerns**: HTTP servers and command-line parsing belong in `api-rest` and
//! `adls-cli`.
//!
//! ## Example
//!
//! ```
//! use adls_core::{DataLakeFileSystem, MountConfig};
//!
//! # fn main() -> Result<(), adls_core::FsError> {
//! let fs = DataLakeFileSystem::new(MountConfig::new("memory://", None, "test")?);
//!
//! fs.mkdir("root/empty_dir")?;
//! let mut file = fs.open("root/a/file.txt", "wb")?;
//! file.write_bytes(b"some text")?;
//! file.close()?;
//!
//! assert_eq!(
//!     fs.ls("root")?,
//!     vec!["root/a", "root/a/file.txt", "root/empty_dir"]
//! );
//! assert_eq!(fs.info("root/a/file.txt")?.size, 9);
//! # Ok(())
//! # }
//! ```

mod cache;
pub mod config;
pub mod constants;
mod detail;
mod error;
mod file;
mod filesystem;
mod lazy;

#[cfg(test)]
mod test_support;

pub use cache::CacheKind;
pub use config::{connect, Endpoint, MountConfig};
pub use detail::{EntryDetail, EntryType, Listing, PathKind};
pub use error::{FsError, FsResult};
pub use file::{BufferedFile, FileOptions, OpenMode};
pub use filesystem::{Connector, DataLakeFileSystem};
pub use lazy::OnceGuard;

pub use adls_store::{PathInfo, RemoteStore, StoreError};
pub use adls_types::{FileSystemName, StorePath};
