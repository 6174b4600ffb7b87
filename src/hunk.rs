//! Grouping edits into hunks and replaying them line by line.
//!
//! ## Merging
//!
//! Each edit is surrounded by a window of `context` unchanged lines. When the
//! windows of consecutive edits touch or overlap on either side, the edits
//! belong to the same [`Hunk`]. Windows are clipped to the file, so a hunk
//! never starts before line 0 or ends past the last line.
//!
//! ## Replay
//!
//! A hunk is an iterator over [`HunkLine`]s. It walks both sides in lockstep:
//! unchanged lines advance both cursors, lines removed from A advance only A,
//! lines added on B advance only B. Within a replaced region all removed lines
//! come before the added ones, like a unified diff.

use crate::edit::Edit;

/// One visited line of a hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HunkLine {
    /// Unchanged line present at `a` on side A and `b` on side B.
    Context { a: usize, b: usize },
    /// Line `a` exists only on side A.
    Deleted { a: usize },
    /// Line `b` exists only on side B.
    Inserted { b: usize },
}

/// An edit list seen through a context window.
#[derive(Debug, Clone, Copy)]
pub struct EditList<'a> {
    edits: &'a [Edit],
    context: usize,
    size_a: usize,
    size_b: usize,
}

impl<'a> EditList<'a> {
    /// `edits` must be sorted by [`Edit::begin_a`] and must not overlap.
    #[must_use]
    pub const fn new(edits: &'a [Edit], context: usize, size_a: usize, size_b: usize) -> Self {
        Self {
            edits,
            context,
            size_a,
            size_b,
        }
    }

    #[inline]
    #[must_use]
    pub const fn edits(&self) -> &'a [Edit] {
        self.edits
    }

    /// The merged hunks, in ascending order.
    #[must_use]
    pub const fn hunks(&self) -> Hunks<'a> {
        Hunks {
            list: *self,
            next: 0,
        }
    }

    /// Whether edit `i` has to be shown together with edit `i - 1`.
    fn combines_with_previous(&self, i: usize) -> bool {
        let (prev, cur) = (&self.edits[i - 1], &self.edits[i]);
        let ctx = self.context;
        cur.begin_a.saturating_sub(ctx) <= prev.end_a.saturating_add(ctx)
            || cur.begin_b.saturating_sub(ctx) <= prev.end_b.saturating_add(ctx)
    }

    /// Index of the last edit in the hunk that starts at edit `first`.
    fn combined_end(&self, first: usize) -> usize {
        let mut end = first + 1;
        while end < self.edits.len() && self.combines_with_previous(end) {
            end += 1;
        }
        end - 1
    }
}

/// Iterator over the hunks of an [`EditList`].
#[derive(Debug, Clone)]
pub struct Hunks<'a> {
    list: EditList<'a>,
    next: usize,
}

impl<'a> Iterator for Hunks<'a> {
    type Item = Hunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.list.edits.len() {
            return None;
        }
        let first = self.next;
        let last = self.list.combined_end(first);
        self.next = last + 1;
        Some(Hunk::new(&self.list, first, last))
    }
}

/// A run of edits plus their surrounding context.
#[derive(Debug, Clone)]
pub struct Hunk<'a> {
    edits: &'a [Edit],
    cur: usize,
    cur_a: usize,
    cur_b: usize,
    start_a: usize,
    start_b: usize,
    end_a: usize,
    end_b: usize,
}

impl<'a> Hunk<'a> {
    fn new(list: &EditList<'a>, first: usize, last: usize) -> Self {
        let edits = &list.edits[first..=last];
        let (head, tail) = (&edits[0], &edits[edits.len() - 1]);
        let start_a = head.begin_a.saturating_sub(list.context);
        let start_b = head.begin_b.saturating_sub(list.context);
        Self {
            edits,
            cur: 0,
            cur_a: start_a,
            cur_b: start_b,
            start_a,
            start_b,
            end_a: list.size_a.min(tail.end_a.saturating_add(list.context)),
            end_b: list.size_b.min(tail.end_b.saturating_add(list.context)),
        }
    }

    /// The edits covered by this hunk.
    #[inline]
    #[must_use]
    pub const fn edits(&self) -> &'a [Edit] {
        self.edits
    }

    /// Lines `[start, end)` of side A covered by this hunk.
    #[inline]
    #[must_use]
    pub const fn range_a(&self) -> std::ops::Range<usize> {
        self.start_a..self.end_a
    }

    #[inline]
    #[must_use]
    pub const fn range_b(&self) -> std::ops::Range<usize> {
        self.start_b..self.end_b
    }

    #[inline]
    #[must_use]
    pub const fn is_start_of_file(&self) -> bool {
        self.start_a == 0 && self.start_b == 0
    }

    #[inline]
    #[must_use]
    pub const fn is_end_of_file(&self, size_a: usize, size_b: usize) -> bool {
        self.end_a == size_a && self.end_b == size_b
    }

    /// The edit the replay cursor is currently in or approaching.
    #[inline]
    #[must_use]
    pub fn current_edit(&self) -> &'a Edit {
        &self.edits[self.cur]
    }

    #[inline]
    fn is_deleted_a(&self) -> bool {
        let e = self.current_edit();
        e.begin_a <= self.cur_a && self.cur_a < e.end_a
    }

    #[inline]
    fn is_inserted_b(&self) -> bool {
        let e = self.current_edit();
        e.begin_b <= self.cur_b && self.cur_b < e.end_b
    }

    /// Whether the cursor sits on a changed line of the current edit.
    #[inline]
    #[must_use]
    pub fn is_modified_line(&self) -> bool {
        self.is_deleted_a() || self.is_inserted_b()
    }

    /// Moves on to the next edit once the cursor has passed the current one.
    fn advance_edit(&mut self) {
        let e = self.current_edit();
        let inside = self.cur_a < e.end_a || self.cur_b < e.end_b;
        if !inside && self.cur + 1 < self.edits.len() {
            self.cur += 1;
        }
    }
}

impl Iterator for Hunk<'_> {
    type Item = HunkLine;

    fn next(&mut self) -> Option<Self::Item> {
        self.advance_edit();
        if self.cur_a >= self.end_a && self.cur_b >= self.end_b {
            return None;
        }

        if self.is_deleted_a() {
            let a = self.cur_a;
            self.cur_a += 1;
            return Some(HunkLine::Deleted { a });
        }
        if self.is_inserted_b() {
            let b = self.cur_b;
            self.cur_b += 1;
            return Some(HunkLine::Inserted { b });
        }

        // Unchanged lines run out on both sides at once in a well-formed list.
        if self.cur_a >= self.end_a || self.cur_b >= self.end_b {
            return None;
        }
        let (a, b) = (self.cur_a, self.cur_b);
        self.cur_a += 1;
        self.cur_b += 1;
        Some(HunkLine::Context { a, b })
    }
}
