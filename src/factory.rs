//! Entry point for a diff request named in patch-set terms.
//!
//! The factory turns `(path, base patch set, target patch set)` into the
//! revisions to compare, fetches the coarse diff and the file's comments, and
//! hands everything to the [`PatchScriptBuilder`].

use tracing::{debug, instrument};

use crate::builder::{BuildInput, PatchScriptBuilder};
use crate::comment::{Comment, CommentDetail, history};
use crate::config::{DiffPreferences, EngineConfig};
use crate::diff::{CoarseDiffCache, DiffKey, FileDiff};
use crate::error::{PatchScriptError, Result};
use crate::intraline::IntralineCache;
use crate::mime::MimeRegistry;
use crate::script::PatchScript;
use crate::side::ObjectStore;
use crate::types::{ObjectId, PatchSetId};

/// Patch-set metadata of the change under review.
pub trait PatchSetRegistry: Send + Sync {
    fn project(&self) -> &str;

    /// All patch sets of the change.
    fn patch_sets(&self) -> Vec<PatchSetId>;

    fn revision(&self, patch_set: PatchSetId) -> Option<ObjectId>;

    /// First parent of the patch set's revision; `None` for a root commit.
    fn parent_revision(&self, patch_set: PatchSetId) -> Option<ObjectId>;
}

/// Published and draft comments.
pub trait CommentStore: Send + Sync {
    /// Every comment on `path`, across all patch sets.
    fn comments(&self, path: &str) -> Result<Vec<Comment>>;
}

/// One diff request.
#[derive(Debug, Clone)]
pub struct ScriptRequest<'a> {
    pub path: &'a str,
    /// Patch set shown on side A; `None` compares against the parent.
    pub base: Option<PatchSetId>,
    pub target: PatchSetId,
    pub preferences: DiffPreferences,
}

pub struct PatchScriptFactory<'a> {
    pub registry: &'a dyn PatchSetRegistry,
    pub diffs: &'a dyn CoarseDiffCache,
    pub comments: &'a dyn CommentStore,
    pub store: &'a dyn ObjectStore,
    pub mime: &'a dyn MimeRegistry,
    pub intraline: &'a dyn IntralineCache,
    pub config: EngineConfig,
}

impl PatchScriptFactory<'_> {
    #[instrument(skip_all, fields(path = request.path, base = ?request.base, target = %request.target))]
    pub fn create(&self, request: &ScriptRequest<'_>) -> Result<PatchScript> {
        let commit_b = self
            .registry
            .revision(request.target)
            .ok_or(PatchScriptError::NoSuchPatchSet(request.target))?;
        let commit_a = match request.base {
            Some(base) => Some(
                self.registry
                    .revision(base)
                    .ok_or(PatchScriptError::NoSuchPatchSet(base))?,
            ),
            None => self.registry.parent_revision(request.target),
        };

        let key = DiffKey {
            project: self.registry.project().to_string(),
            old_id: commit_a.clone(),
            new_id: commit_b.clone(),
            whitespace: request.preferences.ignore_whitespace,
        };
        let list = self.diffs.get(&key)?;
        let file = match list.get(request.path) {
            Some(file) => file.clone(),
            None => {
                debug!("file not in diff, treating as unchanged");
                FileDiff::unchanged(request.path)
            }
        };

        let all_comments = self.load_comments(&file)?;
        let comments = CommentDetail::for_comparison(&all_comments, request.base, request.target);
        let history = history(&self.registry.patch_sets(), &all_comments);

        let builder = PatchScriptBuilder::new(self.store, self.mime, self.intraline, self.config);
        builder.build(
            &request.preferences,
            BuildInput {
                project: self.registry.project(),
                file: &file,
                commit_a: commit_a.as_ref(),
                commit_b: &commit_b,
                against_parent: request.base.is_none(),
                comments,
                history,
            },
        )
    }

    /// Comments on the file under either of its names.
    fn load_comments(&self, file: &FileDiff) -> Result<Vec<Comment>> {
        let mut all = self.comments.comments(&file.path)?;
        if let Some(old) = file.old_path.as_deref().filter(|old| *old != file.path) {
            all.extend(self.comments.comments(old)?);
        }
        Ok(all)
    }
}
