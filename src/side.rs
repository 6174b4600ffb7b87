//! Resolving one side of a file diff to its content.
//!
//! A [`Side`] is one file at one revision: where it lives, what mode it has,
//! its bytes, and how the client should display it. Sides are resolved B
//! after A so that B can take A's already-loaded content when both name the
//! same object with the same mode. Both sides then share one [`Text`], which
//! saves a read and guarantees unchanged regions render from identical bytes.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::mime::{MimeRegistry, MimeType};
use crate::text::{SparseFileContent, Text};
use crate::types::{COMMIT_MSG, DisplayMethod, FileMode, ObjectId};

/// A path's entry in a revision's tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub id: ObjectId,
    pub mode: FileMode,
}

/// Read access to the object store, held for the duration of one request.
pub trait ContentReader {
    /// Looks `path` up in the tree of commit `revision`.
    fn resolve_tree_path(&self, revision: &ObjectId, path: &str) -> Result<Option<TreeEntry>>;

    fn read_blob(&self, id: &ObjectId) -> Result<Vec<u8>>;

    /// The text of the commit-message pseudo-file for `commit`.
    fn read_commit_message(&self, commit: &ObjectId) -> Result<Vec<u8>>;
}

/// Hands out a [`ContentReader`]; dropping the reader releases it.
pub trait ObjectStore: Send + Sync {
    fn open_reader(&self) -> Result<Box<dyn ContentReader + '_>>;
}

/// One revision of one file.
#[derive(Debug, Clone)]
pub struct Side {
    pub path: Option<String>,
    pub id: ObjectId,
    pub mode: FileMode,
    pub text: Arc<Text>,
    pub mime_type: MimeType,
    pub display_method: DisplayMethod,
}

impl Side {
    fn missing(path: Option<&str>) -> Self {
        Self {
            path: path.map(str::to_string),
            id: ObjectId::zero(),
            mode: FileMode::Missing,
            text: Arc::new(Text::empty()),
            mime_type: MimeType::default(),
            display_method: DisplayMethod::None,
        }
    }

    /// Line count.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.text.len()
    }

    /// Whether both sides name the same object with the same mode.
    #[inline]
    #[must_use]
    pub fn same_object(&self, other: &Self) -> bool {
        self.id == other.id && self.mode == other.mode
    }

    /// An empty output container sized for this side.
    #[must_use]
    pub fn sparse_content(&self) -> SparseFileContent {
        SparseFileContent::new(
            self.path.clone(),
            self.size(),
            self.text.missing_newline_at_end(),
        )
    }
}

/// Resolves sides against one reader.
pub struct SideResolver<'a> {
    reader: &'a dyn ContentReader,
    mime: &'a dyn MimeRegistry,
    /// Set when diffing against the parent: the parent commit itself.
    parent_base: Option<&'a ObjectId>,
}

impl<'a> SideResolver<'a> {
    pub fn new(
        reader: &'a dyn ContentReader,
        mime: &'a dyn MimeRegistry,
        parent_base: Option<&'a ObjectId>,
    ) -> Self {
        Self {
            reader,
            mime,
            parent_base,
        }
    }

    /// Resolves `path` in commit `within`.
    ///
    /// A missing path or commit yields a [`FileMode::Missing`] side. Read
    /// failures are returned as errors.
    pub fn resolve(
        &self,
        path: Option<&str>,
        within: Option<&ObjectId>,
        other: Option<&Side>,
    ) -> Result<Side> {
        if path == Some(COMMIT_MSG) {
            return self.resolve_commit_message(within);
        }

        let entry = match (path, within) {
            (Some(path), Some(within)) => self.reader.resolve_tree_path(within, path)?,
            _ => None,
        };
        let Some(TreeEntry { id, mode }) = entry else {
            return Ok(Side::missing(path));
        };

        if let Some(other) = other.filter(|o| o.id == id && o.mode == mode) {
            debug!(%id, "reusing content of the other side");
            return Ok(Side {
                path: path.map(str::to_string),
                id,
                mode,
                text: Arc::clone(&other.text),
                mime_type: other.mime_type.clone(),
                display_method: other.display_method,
            });
        }

        let content = match mode {
            FileMode::File | FileMode::Symlink => self.reader.read_blob(&id)?,
            FileMode::Gitlink => format!("Subproject commit {id}\n").into_bytes(),
            FileMode::Missing => Vec::new(),
        };

        let (mime_type, display_method) = match mode {
            FileMode::Missing => (MimeType::default(), DisplayMethod::None),
            FileMode::Symlink => (MimeType::default(), DisplayMethod::Diff),
            _ if content.is_empty() => (MimeType::default(), DisplayMethod::Diff),
            FileMode::File | FileMode::Gitlink => {
                let mime = self.mime.mime_type(path, &content);
                let display = if mime.is_image() && self.mime.is_safe_inline(&mime) {
                    DisplayMethod::Img
                } else {
                    DisplayMethod::Diff
                };
                (mime, display)
            }
        };

        Ok(Side {
            path: path.map(str::to_string),
            id,
            mode,
            text: Arc::new(Text::new(content)),
            mime_type,
            display_method,
        })
    }

    fn resolve_commit_message(&self, within: Option<&ObjectId>) -> Result<Side> {
        let Some(within) = within else {
            return Ok(Side::missing(Some(COMMIT_MSG)));
        };
        if self.parent_base == Some(within) {
            // The parent's message is not part of the change under review.
            return Ok(Side::missing(Some(COMMIT_MSG)));
        }

        let content = self.reader.read_commit_message(within)?;
        if content.is_empty() {
            return Ok(Side {
                id: within.clone(),
                ..Side::missing(Some(COMMIT_MSG))
            });
        }
        Ok(Side {
            path: Some(COMMIT_MSG.to_string()),
            id: within.clone(),
            mode: FileMode::File,
            text: Arc::new(Text::new(content)),
            mime_type: MimeType::text_plain(),
            display_method: DisplayMethod::Diff,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mime::ExtensionMimeRegistry;
    use crate::testing::MemoryStore;

    fn oid(s: &str) -> ObjectId {
        ObjectId::new(s)
    }

    #[test]
    fn resolves_a_regular_file() {
        let store = MemoryStore::new().with_file("c1", "a.rs", "b1", FileMode::File, "x\ny\n");
        let reader = store.reader();
        let resolver = SideResolver::new(&reader, &ExtensionMimeRegistry, None);

        let side = resolver.resolve(Some("a.rs"), Some(&oid("c1")), None).unwrap();
        assert_eq!(side.id, oid("b1"));
        assert_eq!(side.mode, FileMode::File);
        assert_eq!(side.size(), 2);
        assert_eq!(side.display_method, DisplayMethod::Diff);
        assert_eq!(side.mime_type.as_str(), "text/x-rust");
    }

    #[test]
    fn absent_path_is_missing() {
        let store = MemoryStore::new();
        let reader = store.reader();
        let resolver = SideResolver::new(&reader, &ExtensionMimeRegistry, None);

        let side = resolver.resolve(None, Some(&oid("c1")), None).unwrap();
        assert_eq!(side.mode, FileMode::Missing);
        assert_eq!(side.display_method, DisplayMethod::None);
        assert_eq!(side.size(), 0);

        let side = resolver.resolve(Some("gone.rs"), Some(&oid("c1")), None).unwrap();
        assert_eq!(side.mode, FileMode::Missing);
        assert_eq!(side.path.as_deref(), Some("gone.rs"));
    }

    #[test]
    fn identical_object_reuses_content() {
        let store = MemoryStore::new()
            .with_file("c1", "a.txt", "b1", FileMode::File, "same\n")
            .with_file("c2", "a.txt", "b1", FileMode::File, "same\n");
        let reader = store.reader();
        let resolver = SideResolver::new(&reader, &ExtensionMimeRegistry, None);

        let a = resolver.resolve(Some("a.txt"), Some(&oid("c1")), None).unwrap();
        let b = resolver.resolve(Some("a.txt"), Some(&oid("c2")), Some(&a)).unwrap();

        assert!(Arc::ptr_eq(&a.text, &b.text));
        assert_eq!(a.text.content(), b.text.content());
        assert_eq!(a.display_method, b.display_method);
        assert_eq!(a.mime_type, b.mime_type);
        assert_eq!(store.blob_reads(), 1);
    }

    #[test]
    fn mode_change_does_not_reuse() {
        let store = MemoryStore::new()
            .with_file("c1", "link", "b1", FileMode::File, "target")
            .with_file("c2", "link", "b1", FileMode::Symlink, "target");
        let reader = store.reader();
        let resolver = SideResolver::new(&reader, &ExtensionMimeRegistry, None);

        let a = resolver.resolve(Some("link"), Some(&oid("c1")), None).unwrap();
        let b = resolver.resolve(Some("link"), Some(&oid("c2")), Some(&a)).unwrap();
        assert!(!Arc::ptr_eq(&a.text, &b.text));
        assert_eq!(store.blob_reads(), 2);
        assert_eq!(b.mime_type, MimeType::default());
    }

    #[test]
    fn safe_images_display_inline() {
        let store = MemoryStore::new()
            .with_file("c1", "logo.png", "b1", FileMode::File, "\u{89}PNG")
            .with_file("c1", "logo.svg", "b2", FileMode::File, "<svg/>");
        let reader = store.reader();
        let resolver = SideResolver::new(&reader, &ExtensionMimeRegistry, None);

        let png = resolver.resolve(Some("logo.png"), Some(&oid("c1")), None).unwrap();
        assert_eq!(png.display_method, DisplayMethod::Img);
        let svg = resolver.resolve(Some("logo.svg"), Some(&oid("c1")), None).unwrap();
        assert_eq!(svg.display_method, DisplayMethod::Diff);
    }

    #[test]
    fn gitlink_materializes_subproject_line() {
        let store = MemoryStore::new().with_entry("c1", "vendor/lib", "abc123", FileMode::Gitlink);
        let reader = store.reader();
        let resolver = SideResolver::new(&reader, &ExtensionMimeRegistry, None);

        let side = resolver.resolve(Some("vendor/lib"), Some(&oid("c1")), None).unwrap();
        assert_eq!(side.mode, FileMode::Gitlink);
        assert_eq!(side.text.line(0).as_deref(), Some("Subproject commit abc123"));
        assert_eq!(store.blob_reads(), 0);
    }

    #[test]
    fn commit_message_of_parent_base_is_missing() {
        let store = MemoryStore::new()
            .with_commit_message("p1", "Parent message\n")
            .with_commit_message("c1", "Subject\n\nBody\n");
        let reader = store.reader();
        let parent = oid("p1");
        let resolver = SideResolver::new(&reader, &ExtensionMimeRegistry, Some(&parent));

        let a = resolver.resolve(Some(COMMIT_MSG), Some(&parent), None).unwrap();
        assert_eq!(a.mode, FileMode::Missing);
        assert_eq!(a.display_method, DisplayMethod::None);

        let b = resolver.resolve(Some(COMMIT_MSG), Some(&oid("c1")), Some(&a)).unwrap();
        assert_eq!(b.mode, FileMode::File);
        assert_eq!(b.size(), 3);
        assert_eq!(b.id, oid("c1"));
    }

    #[test]
    fn missing_mode_entry_is_never_displayed() {
        let store = MemoryStore::new().with_file("c1", "ghost.png", "b9", FileMode::Missing, "\u{89}PNG");
        let reader = store.reader();
        let resolver = SideResolver::new(&reader, &ExtensionMimeRegistry, None);

        let side = resolver.resolve(Some("ghost.png"), Some(&oid("c1")), None).unwrap();
        assert_eq!(side.mode, FileMode::Missing);
        assert_eq!(side.display_method, DisplayMethod::None);
        assert_eq!(side.mime_type, MimeType::default());
        assert_eq!(side.size(), 0);
        assert_eq!(store.blob_reads(), 0);
    }

    #[test]
    fn read_failures_propagate() {
        let store = MemoryStore::new().with_entry("c1", "a.rs", "dangling", FileMode::File);
        let reader = store.reader();
        let resolver = SideResolver::new(&reader, &ExtensionMimeRegistry, None);

        let err = resolver.resolve(Some("a.rs"), Some(&oid("c1")), None).unwrap_err();
        assert!(err.to_string().contains("dangling"));
    }

    #[test]
    fn missing_newline_is_tracked() {
        let store = MemoryStore::new().with_file("c1", "a.txt", "b1", FileMode::File, "x\ny");
        let reader = store.reader();
        let resolver = SideResolver::new(&reader, &ExtensionMimeRegistry, None);

        let side = resolver.resolve(Some("a.txt"), Some(&oid("c1")), None).unwrap();
        assert!(side.sparse_content().missing_newline_at_end);
        assert_eq!(side.sparse_content().size, 2);
    }
}
