//! Line-range edits between two revisions.

use serde::{Deserialize, Serialize};

/// A changed region: lines `[begin_a, end_a)` of side A were replaced by
/// lines `[begin_b, end_b)` of side B (0-based).
///
/// An edit with `begin_a == end_a` inserts on B; one with `begin_b == end_b`
/// deletes from A. An edit that is empty on both axes changes nothing and is
/// used as an anchor to keep a location visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edit {
    pub begin_a: usize,
    pub end_a: usize,
    pub begin_b: usize,
    pub end_b: usize,
}

/// Shape of an [`Edit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Insert,
    Delete,
    Replace,
    Empty,
}

impl Edit {
    #[inline]
    #[must_use]
    pub const fn new(begin_a: usize, end_a: usize, begin_b: usize, end_b: usize) -> Self {
        Self {
            begin_a,
            end_a,
            begin_b,
            end_b,
        }
    }

    /// A zero-width edit at `a` on side A and `b` on side B.
    #[inline]
    #[must_use]
    pub const fn empty(a: usize, b: usize) -> Self {
        Self::new(a, a, b, b)
    }

    #[must_use]
    pub const fn kind(&self) -> EditKind {
        match (self.begin_a == self.end_a, self.begin_b == self.end_b) {
            (true, true) => EditKind::Empty,
            (true, false) => EditKind::Insert,
            (false, true) => EditKind::Delete,
            (false, false) => EditKind::Replace,
        }
    }

    /// Whether `a` lies in the closed range `[begin_a, end_a]`.
    #[inline]
    #[must_use]
    pub const fn touches_a(&self, a: usize) -> bool {
        self.begin_a <= a && a <= self.end_a
    }

    /// Whether `b` lies in the closed range `[begin_b, end_b]`.
    #[inline]
    #[must_use]
    pub const fn touches_b(&self, b: usize) -> bool {
        self.begin_b <= b && b <= self.end_b
    }
}

/// Orders edits by their position on side A, then side B.
pub fn sort_edits(edits: &mut [Edit]) {
    edits.sort_by_key(|e| (e.begin_a, e.begin_b));
}
