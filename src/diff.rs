//! Coarse, line-level diffs between two revisions.
//!
//! The coarse diff is computed outside the engine and looked up from a
//! [`CoarseDiffCache`] keyed by the revisions being compared. It covers every
//! file of the two revisions; the engine picks out one [`FileDiff`].

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::Whitespace;
use crate::edit::Edit;
use crate::error::Result;
use crate::types::{ChangeType, ObjectId};

/// The coarse diff of a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDiff {
    pub change_type: ChangeType,

    /// Path in the new revision, or the removed path for a deletion.
    pub path: String,

    /// Source path of a rename or copy.
    pub old_path: Option<String>,

    pub header: Vec<String>,
    pub edits: Vec<Edit>,
}

impl FileDiff {
    /// Entry for a file that did not change between the two revisions.
    #[must_use]
    pub fn unchanged(path: &str) -> Self {
        Self {
            change_type: ChangeType::Modified,
            path: path.to_string(),
            old_path: None,
            header: Vec::new(),
            edits: Vec::new(),
        }
    }

    /// The file's path on side A, if it exists there.
    #[must_use]
    pub fn old_name(&self) -> Option<&str> {
        match self.change_type {
            ChangeType::Added => None,
            ChangeType::Renamed | ChangeType::Copied => {
                Some(self.old_path.as_deref().unwrap_or(&self.path))
            }
            ChangeType::Modified | ChangeType::Deleted | ChangeType::Rewrite => Some(&self.path),
        }
    }

    /// The file's path on side B, if it exists there.
    #[must_use]
    pub fn new_name(&self) -> Option<&str> {
        match self.change_type {
            ChangeType::Deleted => None,
            _ => Some(&self.path),
        }
    }
}

/// All file diffs between two revisions, keyed by [`FileDiff::path`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffList {
    files: BTreeMap<String, FileDiff>,
}

impl DiffList {
    #[inline]
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&FileDiff> {
        self.files.get(path)
    }

    pub fn insert(&mut self, file: FileDiff) {
        self.files.insert(file.path.clone(), file);
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<FileDiff> for DiffList {
    fn from_iter<I: IntoIterator<Item = FileDiff>>(iter: I) -> Self {
        let mut list = Self::default();
        for file in iter {
            list.insert(file);
        }
        list
    }
}

/// Identifies one coarse diff computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiffKey {
    pub project: String,
    /// `None` compares against the empty tree (root commit).
    pub old_id: Option<ObjectId>,
    pub new_id: ObjectId,
    pub whitespace: Whitespace,
}

pub trait CoarseDiffCache: Send + Sync {
    fn get(&self, key: &DiffKey) -> Result<Arc<DiffList>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(change_type: ChangeType, path: &str, old_path: Option<&str>) -> FileDiff {
        FileDiff {
            change_type,
            path: path.into(),
            old_path: old_path.map(String::from),
            header: vec![],
            edits: vec![],
        }
    }

    #[test]
    fn names_per_change_type() {
        let added = file(ChangeType::Added, "new.rs", None);
        assert_eq!(added.old_name(), None);
        assert_eq!(added.new_name(), Some("new.rs"));

        let deleted = file(ChangeType::Deleted, "old.rs", None);
        assert_eq!(deleted.old_name(), Some("old.rs"));
        assert_eq!(deleted.new_name(), None);

        let renamed = file(ChangeType::Renamed, "b.rs", Some("a.rs"));
        assert_eq!(renamed.old_name(), Some("a.rs"));
        assert_eq!(renamed.new_name(), Some("b.rs"));

        let modified = file(ChangeType::Modified, "m.rs", None);
        assert_eq!(modified.old_name(), Some("m.rs"));
        assert_eq!(modified.new_name(), Some("m.rs"));
    }

    #[test]
    fn unchanged_is_an_empty_modification() {
        let f = FileDiff::unchanged("README");
        assert_eq!(f.change_type, ChangeType::Modified);
        assert!(f.edits.is_empty());
        assert!(f.header.is_empty());
    }

    #[test]
    fn list_is_keyed_by_path() {
        let list: DiffList = [
            file(ChangeType::Modified, "b.rs", None),
            file(ChangeType::Added, "a.rs", None),
        ]
        .into_iter()
        .collect();
        assert_eq!(list.len(), 2);
        assert_eq!(list.get("a.rs").map(|f| f.change_type), Some(ChangeType::Added));
        assert!(list.get("c.rs").is_none());
    }
}
