//! Validated value types shared by the store clients and the filesystem façade.
//!
//! Remote paths are slash-separated and relative to the container ("file system") root. Callers
//! hand us paths in many shapes (`"/root/a/"`, `"root//a"`, `"root/a"`), so every path is
//! normalised once into a [`StorePath`] before it reaches a store primitive.

use std::fmt;
use std::str::FromStr;

/// Why a file system (container) name was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("file system name cannot be empty")]
    Empty,

    /// Container names are a single segment
    #[error("file system name must not contain '/': {0}")]
    Slash(String),

    #[error("file system name contains a control character: {0:?}")]
    ControlCharacter(String),
}

/// Errors that can occur when normalising a store path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// A `.` or `..` segment was found
    #[error("Path must not contain relative segments: {0}")]
    Traversal(String),

    /// The path contains a control character (including NUL)
    #[error("Path contains a control character: {0:?}")]
    ControlCharacter(String),
}

/// Name of the container ("file system") a mount targets.
///
/// Surrounding whitespace is trimmed. Rename targets are built as `"<name>/<dest>"`, so the name
/// itself must be a single non-empty segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileSystemName(String);

impl FileSystemName {
    pub fn parse(input: impl AsRef<str>) -> Result<Self, NameError> {
        let name = input.as_ref().trim();
        if name.is_empty() {
            return Err(NameError::Empty);
        }
        if name.contains('/') {
            return Err(NameError::Slash(name.to_owned()));
        }
        if name.chars().any(char::is_control) {
            return Err(NameError::ControlCharacter(name.to_owned()));
        }
        Ok(Self(name.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `"<name>/<dest>"`, the form the store expects for rename destinations.
    pub fn qualify(&self, dest: &StorePath) -> String {
        format!("{}/{}", self.0, dest)
    }
}

impl fmt::Display for FileSystemName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FileSystemName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A normalised, container-relative store path.
///
/// Normal form:
/// - segments separated by a single `/`
/// - no leading or trailing slash
/// - no empty, `.` or `..` segments
///
/// The empty path is the container root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StorePath(String);

impl StorePath {
    /// Normalises `input` into a `StorePath`.
    ///
    /// Leading, trailing and repeated slashes are dropped. `"/"` and `""` both yield the root.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::Traversal`] for `.`/`..` segments and
    /// [`PathError::ControlCharacter`] if any segment contains a control character.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PathError> {
        let input = input.as_ref();
        let mut segments = Vec::new();

        for segment in input.split('/').filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." {
                return Err(PathError::Traversal(input.to_owned()));
            }
            if segment.chars().any(char::is_control) {
                return Err(PathError::ControlCharacter(input.to_owned()));
            }
            segments.push(segment);
        }

        Ok(Self(segments.join("/")))
    }

    /// The container root.
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the parent path, or `None` for the root.
    pub fn parent(&self) -> Option<StorePath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(idx) => Some(Self(self.0[..idx].to_owned())),
            None => Some(Self::root()),
        }
    }

    /// Returns the final segment, or `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.0.rsplit('/').next()
    }

    /// Appends a relative path below this one.
    pub fn join(&self, relative: impl AsRef<str>) -> Result<StorePath, PathError> {
        let relative = StorePath::parse(relative)?;
        if self.is_root() {
            return Ok(relative);
        }
        if relative.is_root() {
            return Ok(self.clone());
        }
        Ok(Self(format!("{}/{}", self.0, relative.0)))
    }

    /// Segment-aware prefix test. Every path starts with the root; `a/bc` does not start with `a/b`.
    pub fn starts_with(&self, base: &StorePath) -> bool {
        self.strip_prefix(base).is_some()
    }

    /// Returns the remainder of `self` below `base` (empty when equal).
    pub fn strip_prefix(&self, base: &StorePath) -> Option<&str> {
        if base.is_root() {
            return Some(&self.0);
        }
        let rest = self.0.strip_prefix(&base.0)?;
        if rest.is_empty() {
            Some(rest)
        } else {
            rest.strip_prefix('/')
        }
    }

    /// Strict ancestors from the top down, excluding the root and `self`.
    ///
    /// `a/b/c` yields `[a, a/b]`.
    pub fn ancestors(&self) -> Vec<StorePath> {
        let mut out = Vec::new();
        for (idx, ch) in self.0.char_indices() {
            if ch == '/' {
                out.push(Self(self.0[..idx].to_owned()));
            }
        }
        out
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for StorePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StorePath::parse(s)
    }
}

impl serde::Serialize for StorePath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for StorePath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        StorePath::parse(&s).map_err(serde::de::Error::custom)
    }
}
