//! In-memory collaborators for unit tests.

use std::collections::HashMap;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::comment::Comment;
use crate::diff::{CoarseDiffCache, DiffKey, DiffList};
use crate::error::{PatchScriptError, Result};
use crate::factory::{CommentStore, PatchSetRegistry};
use crate::intraline::{IntralineCache, IntralineKey, IntralineOutcome};
use crate::side::{ContentReader, ObjectStore, TreeEntry};
use crate::types::{FileMode, ObjectId, PatchSetId};

/// `"line 1\nline 2\n...line n\n"`.
pub fn numbered_lines(n: usize) -> String {
    (1..=n).map(|i| format!("line {i}\n")).collect()
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    trees: HashMap<(String, String), TreeEntry>,
    blobs: HashMap<String, Vec<u8>>,
    messages: HashMap<String, Vec<u8>>,
    blob_reads: AtomicUsize,
    opened: AtomicUsize,
    open: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tree entry without blob content.
    pub fn with_entry(mut self, commit: &str, path: &str, id: &str, mode: FileMode) -> Self {
        self.trees.insert(
            (commit.to_string(), path.to_string()),
            TreeEntry {
                id: ObjectId::new(id),
                mode,
            },
        );
        self
    }

    pub fn with_file(self, commit: &str, path: &str, id: &str, mode: FileMode, content: &str) -> Self {
        let mut store = self.with_entry(commit, path, id, mode);
        store.blobs.insert(id.to_string(), content.as_bytes().to_vec());
        store
    }

    pub fn with_commit_message(mut self, commit: &str, message: &str) -> Self {
        self.messages
            .insert(commit.to_string(), message.as_bytes().to_vec());
        self
    }

    pub fn reader(&self) -> MemoryReader<'_> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.open.fetch_add(1, Ordering::SeqCst);
        MemoryReader { store: self }
    }

    pub fn blob_reads(&self) -> usize {
        self.blob_reads.load(Ordering::SeqCst)
    }

    pub fn readers_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Readers currently not dropped.
    pub fn readers_open(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

impl ObjectStore for MemoryStore {
    fn open_reader(&self) -> Result<Box<dyn ContentReader + '_>> {
        Ok(Box::new(self.reader()))
    }
}

pub struct MemoryReader<'a> {
    store: &'a MemoryStore,
}

impl Drop for MemoryReader<'_> {
    fn drop(&mut self) {
        self.store.open.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ContentReader for MemoryReader<'_> {
    fn resolve_tree_path(&self, revision: &ObjectId, path: &str) -> Result<Option<TreeEntry>> {
        let key = (revision.to_string(), path.to_string());
        Ok(self.store.trees.get(&key).cloned())
    }

    fn read_blob(&self, id: &ObjectId) -> Result<Vec<u8>> {
        self.store.blob_reads.fetch_add(1, Ordering::SeqCst);
        self.store
            .blobs
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| PatchScriptError::unavailable(format!("blob {id}"), "missing object"))
    }

    fn read_commit_message(&self, commit: &ObjectId) -> Result<Vec<u8>> {
        self.store
            .messages
            .get(commit.as_str())
            .cloned()
            .ok_or_else(|| PatchScriptError::unavailable(format!("commit {commit}"), "missing object"))
    }
}

/// Answers every lookup with the same outcome.
pub struct FixedIntraline(pub Option<IntralineOutcome>);

impl IntralineCache for FixedIntraline {
    fn lookup(&self, _key: &IntralineKey<'_>) -> Option<IntralineOutcome> {
        self.0.clone()
    }
}

/// A change whose patch sets map to fixed revisions.
#[derive(Debug, Default)]
pub struct MemoryChange {
    pub project: String,
    pub revisions: HashMap<PatchSetId, ObjectId>,
    pub parents: HashMap<PatchSetId, ObjectId>,
}

impl MemoryChange {
    pub fn new(project: &str) -> Self {
        Self {
            project: project.to_string(),
            ..Self::default()
        }
    }

    pub fn with_patch_set(mut self, ps: u32, revision: &str, parent: Option<&str>) -> Self {
        self.revisions.insert(PatchSetId(ps), ObjectId::new(revision));
        if let Some(parent) = parent {
            self.parents.insert(PatchSetId(ps), ObjectId::new(parent));
        }
        self
    }
}

impl PatchSetRegistry for MemoryChange {
    fn project(&self) -> &str {
        &self.project
    }

    fn patch_sets(&self) -> Vec<PatchSetId> {
        self.revisions.keys().copied().collect()
    }

    fn revision(&self, patch_set: PatchSetId) -> Option<ObjectId> {
        self.revisions.get(&patch_set).cloned()
    }

    fn parent_revision(&self, patch_set: PatchSetId) -> Option<ObjectId> {
        self.parents.get(&patch_set).cloned()
    }
}

/// Coarse diffs registered per key; unknown keys are content errors.
#[derive(Debug, Default)]
pub struct MemoryDiffs {
    lists: HashMap<DiffKey, Arc<DiffList>>,
    lookups: AtomicUsize,
}

impl MemoryDiffs {
    pub fn with(mut self, key: DiffKey, list: DiffList) -> Self {
        self.lists.insert(key, Arc::new(list));
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl CoarseDiffCache for MemoryDiffs {
    fn get(&self, key: &DiffKey) -> Result<Arc<DiffList>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.lists.get(key).cloned().ok_or_else(|| {
            PatchScriptError::unavailable(format!("diff {:?}..{}", key.old_id, key.new_id), "not cached")
        })
    }
}

#[derive(Debug, Default)]
pub struct MemoryComments(pub Vec<(String, Comment)>);

impl CommentStore for MemoryComments {
    fn comments(&self, path: &str) -> Result<Vec<Comment>> {
        Ok(self
            .0
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, c)| c.clone())
            .collect())
    }
}

/// A throwaway repository driven through the `git` binary.
pub struct TempRepo {
    dir: tempfile::TempDir,
}

impl TempRepo {
    pub fn new() -> Self {
        let repo = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        repo.git(&["init", "-q"]);
        repo.git(&["config", "user.name", "Test User"]);
        repo.git(&["config", "user.email", "test@example.com"]);
        repo.git(&["config", "commit.gpgsign", "false"]);
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Runs git in the repository and returns trimmed stdout.
    pub fn git(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .arg("-C")
            .arg(self.path())
            .args(args)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {args:?}: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    pub fn write(&self, path: &str, content: &str) {
        let file = self.path().join(path);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(file, content).unwrap();
    }

    /// Commits everything in the work tree.
    pub fn commit(&self, message: &str) -> ObjectId {
        self.git(&["add", "-A"]);
        self.git(&["commit", "-q", "--allow-empty", "-m", message]);
        ObjectId::new(self.git(&["rev-parse", "HEAD"]))
    }
}
