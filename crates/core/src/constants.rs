//! Constants used throughout the ADLS core crate.

/// Default size of one upload chunk and of one read-ahead block (5 MiB).
pub const DEFAULT_BLOCK_SIZE: usize = 5 * 1024 * 1024;

/// File system (container) used when `STORAGE_FILESYSTEM` is not set.
pub const DEFAULT_FILE_SYSTEM: &str = "test";

/// Full account endpoint, e.g. `https://acct.dfs.core.windows.net/`, `file:///srv/lake`.
pub const ENV_ACCOUNT_URL: &str = "STORAGE_ACCOUNT_URL";

/// Account name, expanded to `https://<name>.dfs.core.windows.net/` when no URL is given.
pub const ENV_ACCOUNT_NAME: &str = "STORAGE_ACCOUNT_NAME";

/// Account key or other credential handed to the store client.
pub const ENV_ACCOUNT_KEY: &str = "STORAGE_ACCOUNT_KEY";

/// File system (container) name.
pub const ENV_FILE_SYSTEM: &str = "STORAGE_FILESYSTEM";

/// Scheme prefix for in-process stores.
pub const MEMORY_SCHEME: &str = "memory://";

/// Scheme prefix for directory-backed stores.
pub const FILE_SCHEME: &str = "file://";
