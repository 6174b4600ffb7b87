//! Identifiers and small closed enumerations shared across the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Path of the pseudo-file that shows a commit's message and metadata.
pub const COMMIT_MSG: &str = "/COMMIT_MSG";

/// A content-addressed object name (commit, tree or blob), kept in hex form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    const ZERO: &'static str = "0000000000000000000000000000000000000000";

    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// The all-zero id, used for sides that do not exist.
    #[must_use]
    pub fn zero() -> Self {
        Self(Self::ZERO.to_string())
    }

    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.bytes().all(|b| b == b'0')
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sequence number of a patch set within its change (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchSetId(pub u32);

impl fmt::Display for PatchSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a file changed between the two revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    Rewrite,
}

impl ChangeType {
    /// Whether both sides hold related content worth refining line by line.
    #[inline]
    #[must_use]
    pub const fn is_modification(self) -> bool {
        matches!(self, Self::Modified | Self::Copied | Self::Renamed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Renamed => "renamed",
            Self::Copied => "copied",
            Self::Rewrite => "rewrite",
        }
    }
}

/// File mode of one side, collapsed to what the viewer distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileMode {
    /// Regular or executable file.
    File,
    Symlink,
    /// Submodule commit reference.
    Gitlink,
    /// The path does not exist on this side.
    Missing,
}

impl FileMode {
    /// Parses an octal git tree mode (`100644`, `120000`, ...).
    ///
    /// Trees and unknown modes yield `None`: they are not file content.
    #[must_use]
    pub fn from_git_mode(mode: &str) -> Option<Self> {
        match mode {
            "100644" | "100755" | "100664" => Some(Self::File),
            "120000" => Some(Self::Symlink),
            "160000" => Some(Self::Gitlink),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Symlink => "symlink",
            Self::Gitlink => "gitlink",
            Self::Missing => "missing",
        }
    }
}

/// How the client should present one side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMethod {
    #[default]
    Diff,
    /// Render inline as an image.
    Img,
    /// Nothing to show.
    None,
}

impl DisplayMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Diff => "diff",
            Self::Img => "img",
            Self::None => "none",
        }
    }
}
