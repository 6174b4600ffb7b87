//! Inline comments as seen by the viewer.

use serde::{Deserialize, Serialize};

use crate::types::PatchSetId;

/// Which revision of its patch set a stored comment is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentSide {
    /// The patch set's parent commit.
    Parent,
    /// The patch set's own revision.
    Revision,
}

/// A published or draft comment on one line of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub patch_set: PatchSetId,
    pub side: CommentSide,

    /// 1-based line number; 0 marks a file-level comment.
    pub line: u32,

    pub author: String,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub draft: bool,
}

/// Comments split by the side of the diff they are shown on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommentDetail {
    pub comments_a: Vec<Comment>,
    pub comments_b: Vec<Comment>,
}

impl CommentDetail {
    /// Selects the comments visible when diffing `base` against `target`.
    ///
    /// Against the parent (`base == None`), the target's parent-side comments
    /// go on A. Between two patch sets, each side shows the revision-side
    /// comments of its own patch set. Both lists come back sorted by line.
    #[must_use]
    pub fn for_comparison(all: &[Comment], base: Option<PatchSetId>, target: PatchSetId) -> Self {
        let on = |ps: PatchSetId, side: CommentSide| {
            move |c: &&Comment| c.patch_set == ps && c.side == side
        };

        let mut comments_a: Vec<Comment> = match base {
            None => all.iter().filter(on(target, CommentSide::Parent)).cloned().collect(),
            Some(base) => all.iter().filter(on(base, CommentSide::Revision)).cloned().collect(),
        };
        let mut comments_b: Vec<Comment> = all
            .iter()
            .filter(on(target, CommentSide::Revision))
            .cloned()
            .collect();

        comments_a.sort_by_key(|c| c.line);
        comments_b.sort_by_key(|c| c.line);
        Self {
            comments_a,
            comments_b,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.comments_a.is_empty() && self.comments_b.is_empty()
    }
}

/// Per-patch-set summary of the comments on one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub patch_set: PatchSetId,
    pub comment_count: usize,
    pub draft_count: usize,
}

/// Builds one history entry for each patch set, in ascending order.
#[must_use]
pub fn history(patch_sets: &[PatchSetId], all: &[Comment]) -> Vec<HistoryEntry> {
    let mut patch_sets = patch_sets.to_vec();
    patch_sets.sort_unstable();
    patch_sets.dedup();

    patch_sets
        .into_iter()
        .map(|ps| {
            let (drafts, published): (Vec<&Comment>, Vec<&Comment>) =
                all.iter().filter(|c| c.patch_set == ps).partition(|c| c.draft);
            HistoryEntry {
                patch_set: ps,
                comment_count: published.len(),
                draft_count: drafts.len(),
            }
        })
        .collect()
}
