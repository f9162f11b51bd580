//! Mount configuration.
//!
//! A mount is resolved once at process startup and then passed into
//! [`DataLakeFileSystem`](crate::DataLakeFileSystem). Environment variables are only read by
//! [`MountConfig::from_env`], never during filesystem calls.

use crate::constants::{
    DEFAULT_FILE_SYSTEM, ENV_ACCOUNT_KEY, ENV_ACCOUNT_NAME, ENV_ACCOUNT_URL, ENV_FILE_SYSTEM,
    FILE_SCHEME, MEMORY_SCHEME,
};
use crate::{FsError, FsResult};
use adls_store::{LocalStore, MemoryStore, RemoteStore};
use adls_types::FileSystemName;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// One logical connection: account endpoint, credential and target file system.
#[derive(Clone)]
pub struct MountConfig {
    account_url: String,
    credential: Option<String>,
    file_system: FileSystemName,
}

impl MountConfig {
    /// Create a new `MountConfig`.
    pub fn new(
        account_url: impl AsRef<str>,
        credential: Option<String>,
        file_system: impl AsRef<str>,
    ) -> FsResult<Self> {
        let account_url = account_url.as_ref().trim();
        if account_url.is_empty() {
            return Err(FsError::InvalidConfig("account_url cannot be empty".into()));
        }
        let file_system = FileSystemName::parse(file_system)
            .map_err(|e| FsError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            account_url: account_url.to_owned(),
            credential: credential.filter(|c| !c.trim().is_empty()),
            file_system,
        })
    }

    /// Resolve the mount from `STORAGE_*` environment variables.
    pub fn from_env() -> FsResult<Self> {
        Self::from_env_values(
            std::env::var(ENV_ACCOUNT_URL).ok(),
            std::env::var(ENV_ACCOUNT_NAME).ok(),
            std::env::var(ENV_ACCOUNT_KEY).ok(),
            std::env::var(ENV_FILE_SYSTEM).ok(),
        )
    }

    /// Build the mount from optional raw values without touching the environment.
    ///
    /// An explicit URL wins over an account name. The file system defaults to
    /// [`DEFAULT_FILE_SYSTEM`].
    pub fn from_env_values(
        account_url: Option<String>,
        account_name: Option<String>,
        credential: Option<String>,
        file_system: Option<String>,
    ) -> FsResult<Self> {
        fn non_blank(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        let account_url = match (non_blank(account_url), non_blank(account_name)) {
            (Some(url), _) => url,
            (None, Some(name)) => format!("https://{}.dfs.core.windows.net/", name),
            (None, None) => {
                return Err(FsError::InvalidConfig(format!(
                    "set {} or {}",
                    ENV_ACCOUNT_URL, ENV_ACCOUNT_NAME
                )))
            }
        };
        let file_system = non_blank(file_system).unwrap_or_else(|| DEFAULT_FILE_SYSTEM.into());

        Self::new(account_url, credential, file_system)
    }

    pub fn account_url(&self) -> &str {
        &self.account_url
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    pub fn file_system(&self) -> &str {
        self.file_system.as_str()
    }

    pub fn file_system_name(&self) -> &FileSystemName {
        &self.file_system
    }

    /// Classify the account URL by scheme.
    pub fn endpoint(&self) -> Endpoint {
        let url = self.account_url.as_str();
        if url.starts_with(MEMORY_SCHEME) {
            Endpoint::Memory
        } else if let Some(dir) = url.strip_prefix(FILE_SCHEME) {
            Endpoint::Local(PathBuf::from(dir))
        } else {
            Endpoint::Remote(url.to_owned())
        }
    }
}

impl fmt::Debug for MountConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountConfig")
            .field("account_url", &self.account_url.as_str())
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("file_system", &self.file_system.as_str())
            .finish()
    }
}

/// Where a mount's store client lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `memory://`: a fresh in-process store
    Memory,
    /// `file://<dir>`: a directory-backed store under `<dir>/<file_system>`
    Local(PathBuf),
    /// Any other URL: needs a network client supplied by the caller
    Remote(String),
}

/// Default connector: builds the store client for a mount's endpoint.
///
/// # Errors
///
/// Returns `FsError::UnsupportedEndpoint` for network endpoints; callers with a network client
/// pass it through [`DataLakeFileSystem::with_connector`](crate::DataLakeFileSystem::with_connector)
/// or [`DataLakeFileSystem::with_client`](crate::DataLakeFileSystem::with_client).
pub fn connect(config: &MountConfig) -> FsResult<Arc<dyn RemoteStore>> {
    match config.endpoint() {
        Endpoint::Memory => Ok(Arc::new(MemoryStore::new(config.file_system()))),
        Endpoint::Local(dir) => {
            if dir.as_os_str().is_empty() {
                return Err(FsError::InvalidConfig(
                    "file:// endpoint needs a directory".into(),
                ));
            }
            Ok(Arc::new(LocalStore::open(&dir, config.file_system())?))
        }
        Endpoint::Remote(url) => Err(FsError::UnsupportedEndpoint(url)),
    }
}
