use adls_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("path not found: {0}")]
    NotFound(String),
    #[error("path already exists: {0}")]
    AlreadyExists(String),
    #[error("failed to create directory {path}: {source}")]
    CreateFailed {
        path: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to remove directory {path}: {source}")]
    NotEmptyOrFailed {
        path: String,
        #[source]
        source: StoreError,
    },
    #[error("unsupported file mode: {0:?} (only read or write)")]
    UnsupportedMode(String),
    #[error("is a directory: {0}")]
    IsADirectory(String),
    #[error("I/O operation on closed file: {0}")]
    Closed(String),
    #[error("file {path} is not open for {operation}")]
    WrongMode {
        path: String,
        operation: &'static str,
    },
    #[error("invalid seek to negative position {0}")]
    InvalidSeek(i64),
    #[error("invalid path: {0}")]
    InvalidPath(#[from] adls_types::PathError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unsupported account endpoint: {0}")]
    UnsupportedEndpoint(String),

    /// Failure reported by the store client, passed through as-is
    #[error(transparent)]
    Remote(#[from] StoreError),
}

impl FsError {
    /// True for a typed `NotFound` as well as a client's own not-found failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FsError::NotFound(_) | FsError::Remote(StoreError::NotFound(_))
        )
    }
}

pub type FsResult<T> = std::result::Result<T, FsError>;
