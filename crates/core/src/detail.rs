//! Detail records and path classification.

use adls_store::PathInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entry type as reported in a detail record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Directory,
}

/// Uniform description of one filesystem entry, as returned by `ls_detail` and `info`.
///
/// Serialises with the fixed keys
/// `name, size, type, permissions, owner, group, last_modified, etag`;
/// `last_modified` is ISO-8601.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EntryDetail {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: EntryType,
    pub permissions: String,
    pub owner: String,
    pub group: String,
    pub last_modified: DateTime<Utc>,
    /// Version token, not a content hash
    pub etag: String,
}

impl EntryDetail {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryType::Directory
    }
}

impl From<PathInfo> for EntryDetail {
    fn from(info: PathInfo) -> Self {
        Self {
            name: info.name,
            size: if info.is_directory {
                0
            } else {
                info.content_length
            },
            kind: if info.is_directory {
                EntryType::Directory
            } else {
                EntryType::File
            },
            permissions: info.permissions,
            owner: info.owner,
            group: info.group,
            last_modified: info.last_modified,
            etag: info.etag,
        }
    }
}

/// Result of probing a path before choosing a remote primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    File,
    Directory,
    Absent,
}

impl PathKind {
    pub(crate) fn of(info: &PathInfo) -> Self {
        if info.is_directory {
            PathKind::Directory
        } else {
            PathKind::File
        }
    }
}

/// Output of `list`: bare names, or full detail records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Names(Vec<String>),
    Detailed(Vec<EntryDetail>),
}

impl Listing {
    /// Names in listing order, whichever form this is.
    pub fn names(&self) -> Vec<&str> {
        match self {
            Listing::Names(names) => names.iter().map(String::as_str).collect(),
            Listing::Detailed(entries) => entries.iter().map(|e| e.name.as_str()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Listing::Names(names) => names.len(),
            Listing::Detailed(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
